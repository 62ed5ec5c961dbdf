//! Launcher settings resolution and download mirror selection.
//!
//! [`mirror`] probes the download mirrors and picks the best connected one,
//! [`settings`] resolves the user's stored settings against that choice and
//! the host's limits.

pub mod cli;
pub mod host;
pub mod language;
pub mod mirror;
pub mod report;
pub mod session;
pub mod settings;
pub mod util;
