mod resolver;
mod store;

pub use resolver::{load, save, update, Loaded, Rejection, ResolveContext};
pub use store::{Entries, FileStore, MemoryStore, SettingsStore, StoreError};

use serde::Serialize;

use crate::host::HostCapabilities;
use crate::language::Language;
use crate::mirror::Mirror;

pub mod keys {
    pub const LANGUAGE: &str = "language";
    pub const SERVER: &str = "server";
    pub const RAM: &str = "ram";
    pub const WINDOW_WIDTH: &str = "windowwidth";
    pub const WINDOW_HEIGHT: &str = "windowheight";
    pub const JAVA_PARAMETERS: &str = "javaparameters";
    pub const ENABLE_CONSOLE: &str = "enableconsole";
    pub const ENABLE_LEADERBOARDS: &str = "enableleaderboards";
    pub const ENABLE_LOGS: &str = "enablelogs";
    pub const FIRST_TIME_RUN: &str = "firsttimerun";

    pub const ALL: [&str; 10] = [
        LANGUAGE,
        SERVER,
        RAM,
        WINDOW_WIDTH,
        WINDOW_HEIGHT,
        JAVA_PARAMETERS,
        ENABLE_CONSOLE,
        ENABLE_LEADERBOARDS,
        ENABLE_LOGS,
        FIRST_TIME_RUN,
    ];
}

/// A bounded numeric setting. `default` applies when the key is missing,
/// `revert` when the stored value is rejected. They differ for the window
/// height.
#[derive(Clone, Copy)]
pub struct NumericField {
    pub key: &'static str,
    pub default: u32,
    pub revert: u32,
    pub bound: fn(&dyn HostCapabilities) -> u32,
}

impl NumericField {
    pub fn max(&self, host: &dyn HostCapabilities) -> u32 {
        (self.bound)(host)
    }
}

fn max_ram(host: &dyn HostCapabilities) -> u32 {
    host.max_ram_mb()
}

fn max_window_width(host: &dyn HostCapabilities) -> u32 {
    host.max_window_width()
}

fn max_window_height(host: &dyn HostCapabilities) -> u32 {
    host.max_window_height()
}

pub const RAM: NumericField = NumericField {
    key: keys::RAM,
    default: 512,
    revert: 512,
    bound: max_ram,
};

pub const WINDOW_WIDTH: NumericField = NumericField {
    key: keys::WINDOW_WIDTH,
    default: 854,
    revert: 854,
    bound: max_window_width,
};

// Missing height defaults to 854 but a rejected one reverts to 480.
pub const WINDOW_HEIGHT: NumericField = NumericField {
    key: keys::WINDOW_HEIGHT,
    default: 854,
    revert: 480,
    bound: max_window_height,
};

/// Resolved user settings. Produced by [`load`], changed only through
/// [`update`] and persisted with [`save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub first_time_run: bool,
    pub language: Language,
    pub server: Mirror,
    pub ram: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub java_parameters: String,
    pub enable_console: bool,
    pub enable_leaderboards: bool,
    pub enable_logs: bool,
}
