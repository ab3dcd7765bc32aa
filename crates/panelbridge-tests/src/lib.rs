// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Panel Bridge Integration Tests
//!
//! End-to-end tests of the link against an in-memory panel. The mock
//! factory hands out `tokio::io::duplex` pairs: the bridge gets one end as
//! its channel, the test drives the other end as the panel.
//!
//! All link tests run on a paused clock (`start_paused = true`), so the
//! 150 ms spacing and the one minute reconnection delay cost nothing.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Panel frames and configuration documents
//!   - `assertions`: Timing and health assertions
//!   - `mocks`: Mock channel factory, mock panel and handlers
//!   - `harness`: Supervisor wired to the mocks
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p panelbridge-tests
//!
//! cargo test -p panelbridge-tests --test integration_link
//! cargo test -p panelbridge-tests --test integration_dispatch
//! cargo test -p panelbridge-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Link Tests (`integration_link.rs`)
//! - Request ordering and write spacing
//! - Stall detection and reconnection
//! - One reconnection per error burst
//! - Bounded, idempotent shutdown
//!
//! ### Dispatch Tests (`integration_dispatch.rs`)
//! - Handler isolation under failing and panicking handlers
//! - Exclusive event/response classification
//! - Link status delivery
//!
//! ### Config Tests (`integration_config.rs`)
//! - Loading YAML, TOML and JSON files
//! - Environment overrides
//! - Building a supervisor from a loaded configuration
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use panelbridge_tests::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_something() {
//!     let harness = BridgeHarness::new();
//!     let mut panel = harness.start().await;
//!
//!     harness.supervisor.send("ZS 1").unwrap();
//!     assert_eq!(panel.next_request().await.as_deref(), Some("ZS 1"));
//! }
//! ```

pub mod common;

/// Common imports for test files.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::init_test_logging;

    pub use panelbridge_core::{
        ClassifiedMessage, HealthStatus, LinkError, LinkState, LinkStatus, MessageHandler,
    };
    pub use panelbridge_serial::{LinkOptions, Supervisor};
}
