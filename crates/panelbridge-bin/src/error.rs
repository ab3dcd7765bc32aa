// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors of the `panelbridge` binary and their process exit codes.
//!
//! | Code | Meaning |
//! |---|---|
//! | 1 | bad configuration or arguments, port unusable with these settings |
//! | 2 | logging could not be installed |
//! | 3 | runtime failure |
//! | 4 | local I/O failure |
//! | 5 | panel link failure |

use thiserror::Error;

use panelbridge_config::ConfigError;
use panelbridge_core::LinkError;

/// Result alias for the binary.
pub type BinResult<T> = Result<T, BinError>;

/// Process exit codes.
pub mod exit_code {
    /// Configuration or arguments rejected.
    pub const CONFIGURATION: i32 = 1;
    /// Logging setup failed.
    pub const LOGGING: i32 = 2;
    /// Runtime failure.
    pub const RUNTIME: i32 = 3;
    /// Local I/O failure.
    pub const IO: i32 = 4;
    /// Communication with the panel failed.
    pub const LINK: i32 = 5;
}

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum BinError {
    /// Arguments or settings that cannot work.
    #[error("invalid settings: {0}")]
    Usage(String),

    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// Anything that went wrong while running.
    #[error("{0}")]
    Runtime(String),

    /// Local I/O (stdin, stdout).
    #[error("i/o: {0}")]
    Io(String),

    /// The configuration file was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The panel link reported an error.
    #[error("panel link: {0}")]
    Link(#[from] LinkError),

    /// Another error with a note on what was being done.
    #[error("{context}: {source}")]
    Context {
        /// What was being done.
        context: String,
        /// What failed.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Invalid arguments or settings.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Logging setup failure.
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    /// Runtime failure.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Wraps the error with a note on what was being done.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Exit code for this error.
    ///
    /// A link error of the configuration class (missing or busy port) counts
    /// as a configuration problem, not a link failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Config(_) => exit_code::CONFIGURATION,
            Self::Link(e) if e.is_configuration() => exit_code::CONFIGURATION,
            Self::Link(_) => exit_code::LINK,
            Self::Logging(_) => exit_code::LOGGING,
            Self::Runtime(_) => exit_code::RUNTIME,
            Self::Io(_) => exit_code::IO,
            Self::Context { source, .. } => source.exit_code(),
        }
    }

    /// Localized hint for the innermost config or link error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Config(e) => Some(e.user_message()),
            Self::Link(e) => Some(e.user_message()),
            Self::Context { source, .. } => source.hint(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{err:#}"))
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Prints the error, its localized hint and its causes to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("panelbridge: {error}");
    if let Some(hint) = error.hint() {
        eprintln!("  {hint}");
    }

    let causes = std::iter::successors(std::error::Error::source(error), |e| e.source());
    for (depth, cause) in causes.enumerate() {
        eprintln!("  {:>width$}- {cause}", "", width = depth * 2);
    }
}

/// Reports the error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_exit_code_and_hint() {
        let err = BinError::from(LinkError::port_busy("/dev/ttyUSB0")).with_context("starting link");

        assert!(err.to_string().starts_with("starting link: panel link:"));
        assert_eq!(err.exit_code(), exit_code::CONFIGURATION);
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_exit_codes_by_kind() {
        let cases = [
            (BinError::usage("zero interval"), exit_code::CONFIGURATION),
            (BinError::logging("already set"), exit_code::LOGGING),
            (BinError::runtime("render"), exit_code::RUNTIME),
            (
                BinError::from(std::io::Error::other("stdout closed")),
                exit_code::IO,
            ),
            (BinError::from(LinkError::ConnectionClosed), exit_code::LINK),
            (
                BinError::from(ConfigError::validation("serial.port", "port must be set")),
                exit_code::CONFIGURATION,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err = BinError::from(ConfigError::file_not_found("bridge.yaml"));
        assert_eq!(
            err.to_string(),
            ConfigError::file_not_found("bridge.yaml").to_string()
        );
        assert!(BinError::usage("x").hint().is_none());
    }

    #[test]
    fn test_from_anyhow_keeps_context() {
        let err: BinError = anyhow::anyhow!("root cause").context("listing ports").into();
        assert_eq!(err.to_string(), "listing ports: root cause");
        assert_eq!(err.exit_code(), exit_code::RUNTIME);
    }
}
