use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::future::join_all;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use super::{MirrorSet, UNREACHABLE_LATENCY};
use crate::util::format_latency;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub mode: ProbeMode,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            mode: ProbeMode::Sequential,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,
    #[error("responded with status {0}")]
    Status(u16),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("{0}")]
    Address(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if err.is_connect() {
            ProbeError::Connect(err.to_string())
        } else {
            ProbeError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Reachable(Duration),
    Unreachable(ProbeError),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable(_))
    }

    pub fn latency(&self) -> Duration {
        match self {
            ProbeOutcome::Reachable(latency) => *latency,
            ProbeOutcome::Unreachable(_) => UNREACHABLE_LATENCY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Position of the mirror in its `MirrorSet`.
    pub index: usize,
    pub name: String,
    pub outcome: ProbeOutcome,
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("launchprefs/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(timeout)
        .timeout(timeout)
        .tcp_nodelay(true)
        .build()
        .context("failed to build HTTP client")
}

/// Probes every enabled, non-auto mirror of `set`. Reports follow list order
/// in both modes.
pub async fn probe_all(
    client: &Client,
    set: &MirrorSet,
    options: ProbeOptions,
) -> Vec<ProbeReport> {
    let targets: Vec<(usize, String, Result<Url, ProbeError>)> = set
        .mirrors()
        .iter()
        .enumerate()
        .filter(|(_, mirror)| !mirror.is_auto() && mirror.enabled)
        .map(|(index, mirror)| {
            let url = set
                .endpoints()
                .liveness_url(mirror)
                .map_err(|err| ProbeError::Address(err.to_string()));
            (index, mirror.name.clone(), url)
        })
        .collect();

    let run = move |(index, name, url): (usize, String, Result<Url, ProbeError>)| async move {
        let outcome = match url {
            Ok(url) => probe_mirror(client, url, options.timeout).await,
            Err(err) => ProbeOutcome::Unreachable(err),
        };
        log_outcome(&name, &outcome);
        ProbeReport {
            index,
            name,
            outcome,
        }
    };

    match options.mode {
        ProbeMode::Sequential => {
            let mut reports = Vec::with_capacity(targets.len());
            for target in targets {
                reports.push(run(target).await);
            }
            reports
        }
        ProbeMode::Concurrent => join_all(targets.into_iter().map(run)).await,
    }
}

/// Issues a HEAD request to `url`. Only a 200 counts as reachable.
pub async fn probe_mirror(client: &Client, url: Url, timeout: Duration) -> ProbeOutcome {
    debug!("probing {url}");
    let started = Instant::now();
    match client.head(url).timeout(timeout).send().await {
        Ok(response) if response.status() == StatusCode::OK => {
            ProbeOutcome::Reachable(started.elapsed())
        }
        Ok(response) => ProbeOutcome::Unreachable(ProbeError::Status(response.status().as_u16())),
        Err(err) => ProbeOutcome::Unreachable(err.into()),
    }
}

fn log_outcome(name: &str, outcome: &ProbeOutcome) {
    match outcome {
        ProbeOutcome::Reachable(latency) => {
            info!("mirror {name} is available ({})", format_latency(*latency))
        }
        ProbeOutcome::Unreachable(err) => warn!("mirror {name} isn't available: {err}"),
    }
}
