// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! ## Module Structure
//!
//! - `fixtures`: Panel frames and configuration documents
//! - `assertions`: Timing and health assertions
//! - `mocks`: In-memory channel factory, panel end and handlers
//! - `harness`: Supervisor wired to the mocks

pub mod assertions;
pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use assertions::*;
pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn` so handler panics and reconnection
/// warnings show up without drowning the output.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
