// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # panelbridge-bin
//!
//! Command-line front end of the panel bridge.
//!
//! - CLI argument parsing with clap
//! - Runtime orchestration around the link supervisor
//! - Graceful shutdown on SIGINT/SIGTERM/SIGQUIT
//! - Logging initialization
//! - Command implementations (run, validate, version, ports)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         main.rs                             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │   cli.rs    │
//!                    └──────┬──────┘
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ runtime  │ │ logging  │
//!        └──────────┘ └────┬─────┘ └──────────┘
//!                          │
//!                   ┌──────▼──────┐
//!                   │  shutdown   │
//!                   └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Open the configured port and log panel traffic
//! panelbridge -c /etc/panelbridge.yaml
//!
//! # Type requests on stdin, print health every 30 seconds
//! panelbridge run --port /dev/ttyUSB0 --stdin --status-interval 30s
//!
//! # Validate configuration
//! panelbridge validate -c bridge.toml
//!
//! # List serial ports
//! panelbridge ports
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::{LogSettings, init_logging};
pub use runtime::{BridgeRuntime, PanelLogHandler, RuntimeBuilder};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
