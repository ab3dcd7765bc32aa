// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! The effective level and format come from, in order: `-q`/`-v`/`-l` and
//! `--log-format`, the `logging` section of the configuration file, and the
//! built-in defaults (`info`, text). `RUST_LOG` replaces the level filter
//! entirely when set.

use panelbridge_config::{ConfigLoader, LoggingConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, LogFormat};
use crate::error::{BinError, BinResult};

/// Filter directives added to every level.
const QUIET_DEPENDENCIES: &[&str] = &["mio=warn", "tokio=info"];

// =============================================================================
// Settings Resolution
// =============================================================================

/// Level and format to initialize logging with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Level filter string.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Combines the command line with an optional `logging` config section.
    pub fn resolve(cli: &Cli, file: Option<&LoggingConfig>) -> Self {
        let level = cli
            .log_level_override()
            .map(str::to_string)
            .or_else(|| file.map(|f| f.level.as_str().to_string()))
            .unwrap_or_else(|| "info".to_string());

        let format = cli
            .log_format
            .or_else(|| file.map(|f| f.format.into()))
            .unwrap_or_default();

        Self { level, format }
    }

    /// Reads the `logging` section of the configured file, if any.
    ///
    /// Load errors are ignored here; the command reports them once logging
    /// is up.
    pub fn from_cli(cli: &Cli) -> Self {
        let file = cli.config.as_ref().and_then(|path| {
            ConfigLoader::new()
                .with_validation(false)
                .load(path)
                .ok()
                .map(|config| config.logging)
        });
        Self::resolve(cli, file.as_ref())
    }
}

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem.
///
/// # Example
///
/// ```ignore
/// use panelbridge_bin::logging::init_logging;
/// use panelbridge_bin::cli::LogFormat;
///
/// init_logging("info", LogFormat::Text)?;
/// ```
pub fn init_logging(level: &str, format: LogFormat) -> BinResult<()> {
    let filter = build_filter(level)?;

    let result = match format {
        LogFormat::Text => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_ansi(is_terminal),
                )
                .try_init()
        }
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Compact => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_ansi(is_terminal),
                )
                .try_init()
        }
    };

    result.map_err(|e| BinError::logging(format!("Failed to initialize logging: {e}")))
}

fn build_filter(level: &str) -> BinResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(level)
        .map_err(|e| BinError::usage(format!("Invalid log level '{level}': {e}")))?;
    for directive in QUIET_DEPENDENCIES {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use panelbridge_config::{LogFormat as FileFormat, LogLevel};

    #[test]
    fn test_defaults_without_file() {
        let cli = Cli::parse_from(["panelbridge"]);
        let settings = LogSettings::resolve(&cli, None);
        assert_eq!(settings.level, "info");
        assert_eq!(settings.format, LogFormat::Text);
    }

    #[test]
    fn test_file_section_applies_when_flags_absent() {
        let cli = Cli::parse_from(["panelbridge"]);
        let file = LoggingConfig {
            level: LogLevel::Debug,
            format: FileFormat::Json,
        };
        let settings = LogSettings::resolve(&cli, Some(&file));
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_flags_win_over_file() {
        let cli = Cli::parse_from(["panelbridge", "-q", "--log-format", "compact"]);
        let file = LoggingConfig {
            level: LogLevel::Trace,
            format: FileFormat::Json,
        };
        let settings = LogSettings::resolve(&cli, Some(&file));
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("info,panelbridge=loudest").is_err());
        }
        assert!(build_filter("panelbridge_serial=debug,info").is_ok());
    }
}
