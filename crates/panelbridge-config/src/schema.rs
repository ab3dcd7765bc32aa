// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the panel bridge.
//!
//! ```text
//! BridgeConfig
//! ├── serial: SerialSettings     (port, baud_rate, data_bits, parity, ...)
//! ├── link: LinkOptions          (send_spacing, stall_threshold, reconnect_delay, ...)
//! ├── resolver: ResolverOptions  (event_marker, error_code)
//! └── logging: LoggingConfig     (level, format)
//! ```
//!
//! Every section has defaults, so an empty document is a valid starting
//! point; only `serial.port` has to be provided before the link can start.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use panelbridge_core::ResolverOptions;
use panelbridge_serial::{LinkOptions, SerialSettings};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Root Configuration
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Serial port settings.
    #[serde(default)]
    pub serial: SerialSettings,

    /// Link timing and queue bound.
    #[serde(default)]
    pub link: LinkOptions,

    /// Frame classification.
    #[serde(default)]
    pub resolver: ResolverOptions,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.serial
            .validate()
            .map_err(|e| ConfigError::from_link("serial", &e))?;

        self.link
            .validate()
            .map_err(|e| ConfigError::from_link("link", &e))?;

        self.resolver
            .validate()
            .map_err(|message| ConfigError::validation("resolver", message))?;

        Ok(())
    }

    /// One-line description used by `validate` and at startup.
    pub fn summary(&self) -> String {
        format!(
            "{} spacing={:?} stall_threshold={} reconnect_delay={:?} max_pending={}",
            self.serial.describe(),
            self.link.send_spacing,
            self.link.stall_threshold,
            self.link.reconnect_delay,
            self.link
                .max_pending
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
        )
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Compact single-line text.
    Compact,
    /// JSON for log aggregation.
    Json,
}

// =============================================================================
// Tests
// =============================================================================
