//! Configuration document loader.
//!
//! The document is shared with the other repo-watch components, so it is
//! read as an untyped tree and only the keys this crate understands are
//! pulled out of it.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::expand::expand_path;

/// Dot-path of the PID file setting.
pub const PID_FILE_KEY: &str = "paths.pid_file";
/// Dot-path of the report file setting.
pub const REPORT_FILE_KEY: &str = "paths.report_file";
/// Dot-path of the submodule report setting.
pub const GIT_SUBMODULES_REPORT_KEY: &str = "paths.git_submodules_report";

/// Path settings found in the config document, already expanded.
///
/// A `None` field means the document did not set it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub pid_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub git_submodules_report: Option<PathBuf>,
}

impl PathOverrides {
    /// Extract the recognised keys from a parsed document.
    ///
    /// Values that are present but not strings are skipped with a warning.
    #[must_use]
    pub fn from_document(doc: &Value) -> Self {
        Self {
            pid_file: path_at(doc, PID_FILE_KEY),
            report_file: path_at(doc, REPORT_FILE_KEY),
            git_submodules_report: path_at(doc, GIT_SUBMODULES_REPORT_KEY),
        }
    }
}

/// Syntax of a config document, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// TOML for `.toml` files, JSON for everything else.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Loads [`PathOverrides`] from a single config document.
#[derive(Debug)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Loader for the document at `path`.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for `index.json` inside a component directory.
    #[must_use]
    pub fn for_component_dir(dir: &Path) -> Self {
        Self::with_path(dir.join(super::CONFIG_FILE))
    }

    /// The document this loader reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the document does not exist, and
    /// a read or parse error if it exists but cannot be used. Callers decide
    /// whether to fall back to defaults; the loader never invents values.
    pub fn load(&self) -> Result<PathOverrides, ConfigError> {
        let doc = self.load_document()?;
        if !doc.is_object() {
            return Err(ConfigError::NotAnObject {
                path: self.path.clone(),
            });
        }
        Ok(PathOverrides::from_document(&doc))
    }

    fn load_document(&self) -> Result<Value, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                ConfigError::ReadError {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;

        tracing::debug!(path = %self.path.display(), "Loading config file");

        match ConfigFormat::from_path(&self.path) {
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
                    path: self.path.clone(),
                    source: e,
                })
            }
            ConfigFormat::Toml => {
                let table: toml::Value =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseToml {
                        path: self.path.clone(),
                        source: e,
                    })?;
                serde_json::to_value(table).map_err(|e| ConfigError::ParseJson {
                    path: self.path.clone(),
                    source: e,
                })
            }
        }
    }
}

/// Look up a dot-separated key in a document tree.
#[must_use]
pub fn lookup<'a>(doc: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(doc, |node, key| node.as_object()?.get(key))
}

fn path_at(doc: &Value, key: &str) -> Option<PathBuf> {
    match lookup(doc, key)? {
        Value::String(raw) => Some(expand_path(raw)),
        other => {
            tracing::warn!(key, value = %other, "Ignoring non-string config value");
            None
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file {path} is not an object at the top level")]
    NotAnObject { path: PathBuf },
}

impl ConfigError {
    /// Whether the document is simply absent, as opposed to broken.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
