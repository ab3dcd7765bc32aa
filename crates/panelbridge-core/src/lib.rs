// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # panelbridge-core
//!
//! Transport-independent building blocks of the panel bridge:
//!
//! - **Codec**: CR-terminated ASCII framing (`Request`, `FrameDecoder`)
//! - **Resolver**: total classification of frames into events and responses
//! - **Message**: the `ClassifiedMessage` sum type handed to handlers
//! - **Dispatcher**: handler registry with per-handler failure isolation
//! - **Counters**: sent / responses / events accounting for stall detection
//! - **Queue**: the FIFO between producers and the sender
//! - **State**: link state machine and health report
//! - **Error**: configuration vs. communication error taxonomy
//!
//! ## Data Flow
//!
//! ```text
//!  producer ──▶ RequestQueue ──▶ sender ──▶ channel
//!
//!  channel ──▶ FrameDecoder ──▶ ResponseResolver ──▶ Dispatcher ──▶ handlers
//!                                                        │
//!                                                   LinkCounters
//! ```
//!
//! The channel, the worker tasks and the supervisor live in
//! `panelbridge-serial`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod codec;
pub mod counters;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod queue;
pub mod resolver;
pub mod state;

// =============================================================================
// Re-exports
// =============================================================================

pub use codec::{FRAME_DELIMITER, FrameDecoder, RawFrame, Request};
pub use counters::{LinkCounters, LinkCountersSnapshot};
pub use dispatcher::{DispatchReport, Dispatcher, HandlerId, MessageHandler};
pub use error::{ErrorClass, HandlerError, LinkError, LinkResult};
pub use message::{ClassifiedMessage, LinkStatus, MessageKind, PanelEvent, PanelResponse};
pub use queue::RequestQueue;
pub use resolver::{ResolverOptions, ResponseResolver};
pub use state::{HealthStatus, LinkHealth, LinkState};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
