// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while reading, parsing and checking a bridge configuration.
//!
//! Every variant names where the problem is: a file path, a dotted field
//! (`link.stall_threshold`) or an environment variable.

use std::path::{Path, PathBuf};
use thiserror::Error;

use panelbridge_core::LinkError;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but is not a valid document.
    #[error("{}: cannot parse: {message}", path.display())]
    Parse {
        /// Configuration file.
        path: PathBuf,
        /// Parser output.
        message: String,
    },

    /// A value is out of range or missing.
    #[error("invalid value for `{field}`: {message}")]
    Validation {
        /// Dotted path of the offending key.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The file could not be read.
    #[error("{}: cannot read: {source}", path.display())]
    Io {
        /// Configuration file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An override variable holds an unusable value.
    #[error("environment variable `{name}`: {message}")]
    InvalidEnvVar {
        /// Variable name, prefix included.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// The file does not exist.
    #[error("{}: no such configuration file", path.display())]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The extension maps to no known format.
    #[error("unsupported configuration format `{format}` (expected yaml, toml or json)")]
    UnsupportedFormat {
        /// Extension as found.
        format: String,
    },

    /// An in-memory document could not be (de)serialized.
    #[error("malformed configuration: {message}")]
    Serialization {
        /// Serde output.
        message: String,
    },
}

impl ConfigError {
    /// Parse failure of `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Rejected value of `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Maps a link settings error to a validation error under `section`.
    ///
    /// `LinkError::InvalidSettings` carries the option name in its `port`
    /// slot, which becomes `section.option`.
    pub fn from_link(section: &str, error: &LinkError) -> Self {
        match error {
            LinkError::InvalidSettings { port, message } => {
                Self::validation(format!("{section}.{port}"), message.clone())
            }
            other => Self::validation(section, other.to_string()),
        }
    }

    /// Read failure of `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Unusable override variable.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Missing file.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Unknown extension.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Serde failure outside a file.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// File involved, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Parse { path, .. } | Self::Io { path, .. } | Self::FileNotFound { path } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Key or variable involved, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::InvalidEnvVar { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Message for the operator, in Korean.
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse { path, message } => {
                format!("설정 파일을 해석할 수 없습니다 ({}): {}", path.display(), message)
            }
            Self::Validation { field, message } => {
                format!("설정 값이 올바르지 않습니다 ({}): {}", field, message)
            }
            Self::Io { path, .. } => {
                format!("설정 파일을 읽을 수 없습니다: {}", path.display())
            }
            Self::InvalidEnvVar { name, message } => {
                format!("환경 변수 값이 올바르지 않습니다 ({}): {}", name, message)
            }
            Self::FileNotFound { path } => {
                format!("설정 파일이 없습니다: {}", path.display())
            }
            Self::UnsupportedFormat { format } => {
                format!("지원되지 않는 설정 파일 형식입니다: {} (yaml, toml, json)", format)
            }
            Self::Serialization { message } => {
                format!("설정 내용이 올바르지 않습니다: {}", message)
            }
        }
    }

    /// Returns `true` if the file itself could not be read.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FileNotFound { .. })
    }

    /// Static label for structured logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "config_parse",
            Self::Validation { .. } => "config_validation",
            Self::Io { .. } => "config_io",
            Self::InvalidEnvVar { .. } => "config_env",
            Self::FileNotFound { .. } => "config_not_found",
            Self::UnsupportedFormat { .. } => "config_format",
            Self::Serialization { .. } => "config_serde",
        }
    }
}
