use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LANGUAGE: &str = "English";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    #[serde(default, alias = "localizedname")]
    pub localized_name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub author: String,
}

impl Language {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            localized_name: name.clone(),
            file: format!("{}.lang", name.to_ascii_lowercase()),
            name,
            author: String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("failed to read language list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid language list {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("language list must contain at least one language")]
    Empty,
}

/// Languages the launcher offers. Never empty, the first entry is the
/// fallback for unknown names.
#[derive(Debug, Clone)]
pub struct LanguageList {
    languages: Vec<Language>,
}

impl LanguageList {
    pub fn new(languages: Vec<Language>) -> Result<Self, LanguageError> {
        if languages.is_empty() {
            return Err(LanguageError::Empty);
        }
        Ok(Self { languages })
    }

    pub fn builtin() -> Self {
        Self {
            languages: vec![Language::named(DEFAULT_LANGUAGE)],
        }
    }

    /// Reads a JSON array of languages.
    pub fn from_json_file(path: &Path) -> Result<Self, LanguageError> {
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| LanguageError::Io {
            path: display.clone(),
            source,
        })?;
        let languages: Vec<Language> =
            serde_json::from_str(&raw).map_err(|source| LanguageError::Parse {
                path: display,
                source,
            })?;
        Self::new(languages)
    }

    pub fn first(&self) -> &Language {
        &self.languages[0]
    }

    pub fn lookup(&self, name: &str) -> Option<&Language> {
        self.languages
            .iter()
            .find(|language| language.name.eq_ignore_ascii_case(name))
    }

    pub fn all(&self) -> &[Language] {
        &self.languages
    }
}
