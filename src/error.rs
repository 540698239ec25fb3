use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path} (line {line}): {reason}")]
    Ini {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file")]
    UnknownKeys(Vec<SettingsError>),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("No config file to persist to: the config file list is empty")]
    NoPersistPath,

    #[error("App name is required: call .app_name() on the builder")]
    AppNameRequired,

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("{0}")]
    Validation(clap::Error),

    #[error("Failed to capture interrupts: {0}")]
    Interrupt(String),
}

impl SettingsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }
}
