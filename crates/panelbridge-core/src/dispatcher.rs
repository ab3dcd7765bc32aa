// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Observer fan-out of classified messages.
//!
//! The [`Dispatcher`] owns the handler registry and the per-kind counters.
//! It is called from the receiver for every inbound frame and from the
//! supervisor for link status changes.
//!
//! # Isolation
//!
//! A handler that returns an error or panics is logged and counted; the
//! remaining handlers still see the message and the caller never observes
//! the failure.
//!
//! # Concurrency
//!
//! The registry is a lock-protected vector. Dispatch clones the current list
//! under a read lock and releases the lock before invoking anything, so
//! handlers may register or unregister (themselves included) while being
//! called.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use panelbridge_core::dispatcher::{Dispatcher, MessageHandler};
//!
//! let dispatcher = Dispatcher::new(Arc::new(LinkCounters::new()));
//! let id = dispatcher.register(Arc::new(MyHandler));
//! dispatcher.dispatch(&message);
//! dispatcher.unregister(id);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::counters::LinkCounters;
use crate::error::HandlerError;
use crate::message::ClassifiedMessage;

// =============================================================================
// MessageHandler
// =============================================================================

/// Receives every classified message.
///
/// Handlers run on the receiver task and should return quickly; long work
/// belongs on a separate task fed from here.
pub trait MessageHandler: Send + Sync {
    /// Handler name used in logs.
    fn name(&self) -> &str;

    /// Handles one message.
    fn on_message(&self, message: &ClassifiedMessage) -> Result<(), HandlerError>;
}

/// Identifier returned by [`Dispatcher::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Returns the numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

// =============================================================================
// DispatchReport
// =============================================================================

/// Outcome of a single dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that were invoked.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

// =============================================================================
// Dispatcher
// =============================================================================

type Registration = (HandlerId, Arc<dyn MessageHandler>);

/// Handler registry and fan-out.
pub struct Dispatcher {
    handlers: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    counters: Arc<LinkCounters>,
}

impl Dispatcher {
    /// Creates a dispatcher that updates `counters`.
    pub fn new(counters: Arc<LinkCounters>) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            counters,
        }
    }

    /// Registers a handler.
    pub fn register(&self, handler: Arc<dyn MessageHandler>) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(handler = handler.name(), id = %id, "Registered message handler");
        self.handlers.write().push((id, handler));
        id
    }

    /// Removes a handler by id. Returns `false` if it was not registered.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        before != handlers.len()
    }

    /// Removes all handlers with a specific name. Returns how many were removed.
    pub fn unregister_named(&self, name: &str) -> usize {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(_, handler)| handler.name() != name);
        before - handlers.len()
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns the shared counters.
    pub fn counters(&self) -> &Arc<LinkCounters> {
        &self.counters
    }

    /// Counts the message and delivers it to every registered handler.
    pub fn dispatch(&self, message: &ClassifiedMessage) -> DispatchReport {
        match message {
            ClassifiedMessage::Event(_) => {
                self.counters.record_event();
            }
            ClassifiedMessage::Response(_) => {
                self.counters.record_response();
            }
            ClassifiedMessage::Status(_) => {}
        }

        let handlers = self.handlers.read().clone();
        let mut report = DispatchReport::default();

        for (id, handler) in handlers {
            report.delivered += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.on_message(message)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    self.counters.record_handler_failure();
                    tracing::warn!(
                        handler = handler.name(),
                        id = %id,
                        kind = ?message.kind(),
                        error = %e,
                        "Message handler failed"
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    self.counters.record_handler_failure();
                    tracing::error!(
                        handler = handler.name(),
                        id = %id,
                        kind = ?message.kind(),
                        panic = panic_message(payload.as_ref()),
                        "Message handler panicked"
                    );
                }
            }
        }

        report
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let names: Vec<_> = handlers.iter().map(|(_, h)| h.name().to_string()).collect();
        f.debug_struct("Dispatcher")
            .field("handlers", &names)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

// =============================================================================
// Tests
// =============================================================================
