// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # panelbridge-config
//!
//! Configuration for the panel bridge.
//!
//! [`BridgeConfig`] has a default for every key except `serial.port`. Files
//! may be YAML, TOML or JSON. `${VAR}` / `${VAR:default}` placeholders are
//! substituted before parsing and `PANELBRIDGE_*` variables override keys
//! after it; see [`loader`].
//!
//! ```no_run
//! let config = panelbridge_config::load_config("bridge.yaml")?;
//! println!("port: {}", config.serial.port);
//! # Ok::<(), panelbridge_config::ConfigError>(())
//! ```
//!
//! ## Configuration Schema
//!
//! ```yaml
//! serial:
//!   port: /dev/ttyUSB0
//!   baud_rate: 9600
//! link:
//!   send_spacing: 150ms
//!   stall_threshold: 5
//!   reconnect_delay: 1m
//! resolver:
//!   event_marker: "!"
//!   error_code: ERR
//! logging:
//!   level: info
//!   format: text
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ConfigFormat, ConfigLoader, DEFAULT_ENV_PREFIX, EnvSource, load_config,
    load_config_str,
};
pub use schema::{BridgeConfig, LogFormat, LogLevel, LoggingConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
