use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};

use crate::host::{WindowBounds, DEFAULT_MAX_WINDOW_HEIGHT, DEFAULT_MAX_WINDOW_WIDTH};
use crate::mirror::{
    Endpoints, Mirror, ProbeMode, ProbeOptions, AUTO_MIRROR_NAME, DEFAULT_LIVENESS_PATH,
    DEFAULT_SCHEME,
};
use crate::report::OutputMode;
use crate::util::parse_mirror_spec;

pub const DEFAULT_SETTINGS_FILE: &str = "launcher.conf";

#[derive(Parser, Debug, Clone)]
#[command(name = "launchprefs", author, version, about = "Launcher settings and download mirror selection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file
    #[arg(short, long, value_name = "path", default_value = DEFAULT_SETTINGS_FILE, global = true)]
    pub settings: PathBuf,

    /// Per-mirror probe timeout in milliseconds
    #[arg(long = "timeout", value_name = "ms", default_value_t = 3000, global = true)]
    pub timeout_ms: u64,

    /// Probe all mirrors at once instead of one after another
    #[arg(long = "concurrent", action = ArgAction::SetTrue, global = true)]
    pub concurrent: bool,

    /// Replace the builtin mirrors (NAME=HOST, repeatable)
    #[arg(short = 'm', long = "mirror", value_name = "name=host", global = true)]
    pub mirrors: Vec<String>,

    /// URL scheme used to reach mirrors
    #[arg(long = "scheme", value_name = "scheme", default_value = DEFAULT_SCHEME, global = true)]
    pub scheme: String,

    /// Path probed on each mirror
    #[arg(long = "liveness-path", value_name = "path", default_value = DEFAULT_LIVENESS_PATH, global = true)]
    pub liveness_path: String,

    /// JSON array of available languages
    #[arg(long = "languages", value_name = "path", global = true)]
    pub languages: Option<PathBuf>,

    /// Widest game window allowed
    #[arg(long = "max-window-width", value_name = "px", default_value_t = DEFAULT_MAX_WINDOW_WIDTH, global = true)]
    pub max_window_width: u32,

    /// Tallest game window allowed
    #[arg(long = "max-window-height", value_name = "px", default_value_t = DEFAULT_MAX_WINDOW_HEIGHT, global = true)]
    pub max_window_height: u32,

    /// Quiet mode
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, conflicts_with = "verbose", global = true)]
    pub quiet: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    pub verbose: bool,

    /// Print a JSON document instead of text
    #[arg(long = "json", action = ArgAction::SetTrue, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Probe the mirrors and report the best connected one
    Probe,
    /// Show the resolved settings
    Show,
    /// Change one setting and save
    Set {
        #[arg(value_name = "key")]
        key: String,
        #[arg(value_name = "value")]
        value: String,
    },
    /// Print the download URL of a file on the configured server
    Url {
        #[arg(value_name = "file")]
        filename: String,
    },
    /// Write a complete settings file
    Init,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub command: Command,
    pub settings_path: PathBuf,
    pub mirrors: Option<Vec<Mirror>>,
    pub endpoints: Endpoints,
    pub probe: ProbeOptions,
    pub languages_path: Option<PathBuf>,
    pub window: WindowBounds,
    pub output: OutputMode,
}

impl TryFrom<Cli> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        if cli.timeout_ms == 0 {
            return Err(anyhow!("--timeout must be greater than zero"));
        }
        if cli.max_window_width == 0 || cli.max_window_height == 0 {
            return Err(anyhow!("window bounds must be greater than zero"));
        }

        let scheme = cli.scheme.trim().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(anyhow!("unsupported URL scheme: {scheme}"));
        }
        let endpoints = Endpoints {
            scheme,
            liveness_path: cli.liveness_path.trim().trim_start_matches('/').to_string(),
        };

        let mirrors = if cli.mirrors.is_empty() {
            None
        } else {
            let mut parsed = Vec::with_capacity(cli.mirrors.len());
            for spec in &cli.mirrors {
                let (name, host) = parse_mirror_spec(spec)?;
                let mirror = Mirror::new(name, host);
                if mirror.name.eq_ignore_ascii_case(AUTO_MIRROR_NAME) {
                    return Err(anyhow!("{AUTO_MIRROR_NAME} is reserved for automatic selection"));
                }
                endpoints
                    .liveness_url(&mirror)
                    .with_context(|| format!("invalid mirror: {spec}"))?;
                if parsed.iter().any(|m: &Mirror| m.name.eq_ignore_ascii_case(&mirror.name)) {
                    return Err(anyhow!("mirror {} given more than once", mirror.name));
                }
                parsed.push(mirror);
            }
            Some(parsed)
        };

        let output = if cli.json {
            OutputMode::Json
        } else if cli.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Text
        };

        Ok(AppConfig {
            command: cli.command,
            settings_path: cli.settings,
            mirrors,
            endpoints,
            probe: ProbeOptions {
                timeout: Duration::from_millis(cli.timeout_ms),
                mode: if cli.concurrent {
                    ProbeMode::Concurrent
                } else {
                    ProbeMode::Sequential
                },
            },
            languages_path: cli.languages,
            window: WindowBounds {
                width: cli.max_window_width,
                height: cli.max_window_height,
            },
            output,
        })
    }
}
