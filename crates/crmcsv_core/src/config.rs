//! Importer configuration.
//!
//! # Responsibility
//! - Describe the target tag/list, email policy and export settings.
//! - Load overrides from an optional JSON file and validate them.
//!
//! # Invariants
//! - Every field has a default; a missing file key keeps the default.
//! - A config returned by `load_config` has passed `validate()`.

use crate::record::EmailPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_TAG_SLUG: &str = "random-user";
pub const DEFAULT_TAG_TITLE: &str = "Random user";
pub const DEFAULT_LIST_SLUG: &str = "random-user-list";
pub const DEFAULT_LIST_TITLE: &str = "Random user list";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "fluentcrm-contacts.csv";
pub const DEFAULT_EXPORT_PAGE_SIZE: u32 = 500;

/// Slug plus the title used when the segment has to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTarget {
    pub slug: String,
    pub title: String,
}

impl SegmentTarget {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// File name advertised in the attachment header.
    pub file_name: String,
    /// Contacts fetched per store round-trip.
    pub page_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            page_size: DEFAULT_EXPORT_PAGE_SIZE,
        }
    }
}

/// Top-level configuration for import and export runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub tag: SegmentTarget,
    pub list: SegmentTarget,
    pub email_policy: EmailPolicy,
    pub export: ExportConfig,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            tag: SegmentTarget::new(DEFAULT_TAG_SLUG, DEFAULT_TAG_TITLE),
            list: SegmentTarget::new(DEFAULT_LIST_SLUG, DEFAULT_LIST_TITLE),
            email_policy: EmailPolicy::default(),
            export: ExportConfig::default(),
        }
    }
}

impl ImporterConfig {
    /// Rejects values that would make an import or export meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, target) in [("tag", &self.tag), ("list", &self.list)] {
            if target.slug.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name}.slug must not be empty")));
            }
            if target.title.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{name}.title must not be empty"
                )));
            }
        }
        if self.export.page_size == 0 {
            return Err(ConfigError::Invalid(
                "export.page_size must be greater than zero".to_string(),
            ));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "export.file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration load errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Loads and validates a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ImporterConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ImporterConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
