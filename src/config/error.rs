//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no configuration file found, searched: {searched:?}")]
    ConfigFileNotFound { searched: Vec<PathBuf> },

    #[error("failed to read configuration file '{path}': {message}")]
    FileRead { path: String, message: String },

    #[error("invalid YAML in '{path}': {message}")]
    InvalidYaml { path: String, message: String },

    #[error("invalid value for '{field}' ({value}): {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn config_file_not_found(searched: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched }
    }

    pub fn file_read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            message: source.to_string(),
        }
    }

    pub fn invalid_yaml(path: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidYaml {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
