use std::time::Duration;

use anyhow::{anyhow, Result};

/// Anything other than `true` (ignoring case) reads as false.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

pub fn format_flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn format_latency(latency: Duration) -> String {
    let millis = latency.as_secs_f64() * 1000.0;
    if millis >= 1000.0 {
        format!("{:.2} s", millis / 1000.0)
    } else {
        format!("{millis:.0} ms")
    }
}

/// Parses a `NAME=HOST` mirror definition.
pub fn parse_mirror_spec(input: &str) -> Result<(String, String)> {
    let (name, host) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("mirror must be given as NAME=HOST, got {input:?}"))?;
    let (name, host) = (name.trim(), host.trim());
    if name.is_empty() {
        return Err(anyhow!("mirror name cannot be empty"));
    }
    if host.is_empty() {
        return Err(anyhow!("mirror {name} needs a hostname"));
    }
    if host.contains('/') {
        return Err(anyhow!("mirror {name} must be a hostname, not a URL: {host}"));
    }
    Ok((name.to_string(), host.to_string()))
}
