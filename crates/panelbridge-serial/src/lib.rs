// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # panelbridge-serial
//!
//! Runtime side of the panel bridge: the byte channel, the two worker tasks
//! and the [`Supervisor`] that owns their lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              Supervisor                              │
//! │  start / stop / send_request / register_handler / health             │
//! └───────┬───────────────────────────────┬──────────────────────────────┘
//!         │ open()                        │ spawn per session
//!         ▼                               ▼
//! ┌────────────────┐      ┌──────────────────────┐   ┌──────────────────────┐
//! │ ChannelFactory │      │ sender               │   │ receiver             │
//! │ (serial, mock) │      │ queue ─▶ write, 150ms│   │ read ─▶ frames ─▶    │
//! └───────┬────────┘      │ spacing, sent++      │   │ resolve ─▶ dispatch  │
//!         │               └──────────┬───────────┘   │ ─▶ stall check       │
//!         ▼                          │               └──────────┬───────────┘
//!      Channel ◀─────────────────────┴──────────────────────────┘
//! ```
//!
//! Worker failures are reported back to the supervisor, which tears the
//! session down and schedules exactly one reconnection.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use panelbridge_serial::{LinkOptions, SerialChannelFactory, SerialSettings, Supervisor};
//!
//! let settings = SerialSettings::new("/dev/ttyUSB0").with_baud_rate(9600);
//! let supervisor = Supervisor::new(
//!     Arc::new(SerialChannelFactory::new(settings)),
//!     LinkOptions::default(),
//! )?;
//! supervisor.start().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod channel;
pub mod receiver;
pub mod sender;
pub mod supervisor;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use channel::{Channel, ChannelFactory, ChannelReader, ChannelWriter, SerialChannelFactory};
pub use receiver::{ReceiverContext, StallDetector, run_receiver};
pub use sender::{SenderContext, run_sender};
pub use supervisor::{Supervisor, SupervisorBuilder};
pub use types::{
    DataBits, FlowControl, LinkOptions, Parity, SerialSettings, StopBits, VALID_BAUD_RATES,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
