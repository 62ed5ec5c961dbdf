use std::io::{IsTerminal, Write};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use url::Url;

use crate::mirror::{Mirror, MirrorSet, Offline, ProbeOutcome, ProbeReport};
use crate::settings::{Loaded, Settings};
use crate::util::format_latency;

const SPINNER_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,
    Text,
    Json,
}

/// Spinner shown on a terminal while mirrors are probed.
pub struct ProbeSpinner {
    bar: Option<ProgressBar>,
}

impl ProbeSpinner {
    pub fn start(mode: OutputMode, mirrors: usize) -> Self {
        if mode != OutputMode::Text || !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(format!("probing {mirrors} mirrors"));
        bar.enable_steady_tick(SPINNER_TICK);
        Self { bar: Some(bar) }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Everything one command produced, rendered in a single pass.
pub struct Outcome<'a> {
    pub mirrors: &'a MirrorSet,
    pub reports: &'a [ProbeReport],
    pub selection: &'a Result<Mirror, Offline>,
    pub loaded: Option<&'a Loaded>,
    pub saved_to: Option<String>,
    pub url: Option<&'a Url>,
}

pub fn render(mode: OutputMode, outcome: &Outcome<'_>) {
    match mode {
        OutputMode::Quiet => {
            // the URL is the answer to `url`, print it even when quiet
            if let Some(url) = outcome.url {
                println!("{url}");
            }
        }
        OutputMode::Text => render_text(outcome),
        OutputMode::Json => render_json(outcome),
    }
    let _ = std::io::stdout().flush();
}

fn render_text(outcome: &Outcome<'_>) {
    if let Some(url) = outcome.url {
        println!("{url}");
        return;
    }

    println!("{}", "Mirrors".bold());
    for mirror in outcome.mirrors.mirrors().iter().filter(|m| !m.is_auto()) {
        let report = outcome.reports.iter().find(|r| r.name == mirror.name);
        let status = match report.map(|r| &r.outcome) {
            Some(ProbeOutcome::Reachable(latency)) => format_latency(*latency).green(),
            Some(ProbeOutcome::Unreachable(err)) => format!("unavailable: {err}").red(),
            None if !mirror.enabled => "disabled".dimmed(),
            None => "not probed".dimmed(),
        };
        let marker = match outcome.selection {
            Ok(best) if best.name == mirror.name => "*",
            _ => " ",
        };
        println!("{marker} {:<12} {:<24} {status}", mirror.name, mirror.hostname);
    }
    match outcome.selection {
        Ok(best) => println!("best connected mirror: {}", best.name.bold()),
        Err(offline) => println!("{}", offline.to_string().yellow()),
    }

    if let Some(loaded) = outcome.loaded {
        println!();
        println!("{}", "Settings".bold());
        render_settings_text(&loaded.settings);
        for correction in &loaded.corrections {
            println!("{} {correction}", "corrected:".yellow());
        }
    }
    if let Some(path) = &outcome.saved_to {
        println!("saved to {path}");
    }
}

fn render_settings_text(settings: &Settings) {
    let rows = [
        ("language", settings.language.name.clone()),
        ("server", settings.server.name.clone()),
        ("ram", format!("{} MB", settings.ram)),
        (
            "window",
            format!("{}x{}", settings.window_width, settings.window_height),
        ),
        ("java parameters", settings.java_parameters.clone()),
        ("console", settings.enable_console.to_string()),
        ("leaderboards", settings.enable_leaderboards.to_string()),
        ("logs", settings.enable_logs.to_string()),
        ("first run", settings.first_time_run.to_string()),
    ];
    for (label, value) in rows {
        println!("  {label:<16} {value}");
    }
}

fn render_json(outcome: &Outcome<'_>) {
    let document = JsonDocument::from_outcome(outcome);
    if let Ok(serialized) = serde_json::to_string(&document) {
        println!("{serialized}");
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    mirrors: Vec<JsonMirror<'a>>,
    best: Option<&'a str>,
    offline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a Settings>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    corrections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonMirror<'a> {
    name: &'a str,
    hostname: &'a str,
    enabled: bool,
    latency_ms: Option<u128>,
    error: Option<String>,
}

impl<'a> JsonDocument<'a> {
    fn from_outcome(outcome: &'a Outcome<'a>) -> Self {
        let mirrors = outcome
            .mirrors
            .mirrors()
            .iter()
            .filter(|m| !m.is_auto())
            .map(|mirror| {
                let report = outcome.reports.iter().find(|r| r.name == mirror.name);
                let (latency_ms, error) = match report.map(|r| &r.outcome) {
                    Some(ProbeOutcome::Reachable(latency)) => (Some(latency.as_millis()), None),
                    Some(ProbeOutcome::Unreachable(err)) => (None, Some(err.to_string())),
                    None => (None, None),
                };
                JsonMirror {
                    name: &mirror.name,
                    hostname: &mirror.hostname,
                    enabled: mirror.enabled,
                    latency_ms,
                    error,
                }
            })
            .collect();

        JsonDocument {
            mirrors,
            best: outcome.selection.as_ref().ok().map(|m| m.name.as_str()),
            offline: outcome.mirrors.is_offline(),
            settings: outcome.loaded.map(|l| &l.settings),
            corrections: outcome
                .loaded
                .map(|l| l.corrections.iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            saved_to: outcome.saved_to.as_deref(),
            url: outcome.url.map(Url::as_str),
        }
    }
}
