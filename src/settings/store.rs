use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::debug;
use tempfile::NamedTempFile;
use thiserror::Error;

pub type Entries = BTreeMap<String, String>;

const HEADER: &str = "# Launcher Settings";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write settings to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A flat key to string mapping the settings live in.
pub trait SettingsStore {
    fn read(&self) -> Result<Entries, StoreError>;
    fn write(&self, entries: &Entries) -> Result<(), StoreError>;
}

/// Human-editable `key=value` file, one entry per line.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_err(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for FileStore {
    fn read(&self) -> Result<Entries, StoreError> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(parse_entries(&decode(raw))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no settings file at {:?}; starting empty", self.path);
                Ok(Entries::new())
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replaces the file atomically via a sibling temp file.
    fn write(&self, entries: &Entries) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| self.write_err(err))?;

        let mut file = NamedTempFile::new_in(&dir).map_err(|err| self.write_err(err))?;
        file.write_all(render_entries(entries).as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|err| self.write_err(err))?;
        file.persist(&self.path)
            .map_err(|err| self.write_err(err.error))?;
        debug!("wrote {} settings to {:?}", entries.len(), self.path);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new(entries: Entries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn with<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn snapshot(&self) -> Entries {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemoryStore {
    fn read(&self) -> Result<Entries, StoreError> {
        Ok(self.snapshot())
    }

    fn write(&self, entries: &Entries) -> Result<(), StoreError> {
        let mut current = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *current = entries.clone();
        Ok(())
    }
}

/// Hand-edited files are not always UTF-8. Anything that isn't is read as
/// Latin-1 so one odd byte cannot hide the rest of the file.
fn decode(raw: Vec<u8>) -> String {
    match String::from_utf8(raw) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn parse_entries(raw: &str) -> Entries {
    let mut entries = Entries::new();
    for line in raw.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = match line.find(['=', ':']) {
            Some(at) => (&line[..at], &line[at + 1..]),
            None => (line, ""),
        };
        entries.insert(key.trim().to_string(), unescape(value.trim_start()));
    }
    entries
}

fn render_entries(entries: &Entries) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (key, value) in entries {
        out.push_str(key);
        out.push('=');
        out.push_str(&escape(value));
        out.push('\n');
    }
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, ch) in value.chars().enumerate() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Leading whitespace would be trimmed as part of the separator.
            lead if i == 0 && lead.is_whitespace() => {
                out.push('\\');
                out.push(lead);
            }
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
