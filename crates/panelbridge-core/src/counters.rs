// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Link counters shared by the sender, the receiver and the supervisor.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// LinkCounters
// =============================================================================

/// Lock-free message counters.
///
/// `sent` is written by the sender, `responses` and `events` by the
/// dispatcher running on the receiver; the supervisor reads all of them.
#[derive(Debug, Default)]
pub struct LinkCounters {
    sent: AtomicU64,
    responses: AtomicU64,
    events: AtomicU64,
    handler_failures: AtomicU64,
    /// Unix milliseconds of the last inbound frame, 0 if none.
    last_frame_ms: AtomicI64,
}

impl LinkCounters {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one frame written to the channel.
    pub fn record_sent(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records one response received.
    pub fn record_response(&self) -> u64 {
        self.touch();
        self.responses.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records one event received.
    pub fn record_event(&self) -> u64 {
        self.touch();
        self.events.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records a failed handler invocation.
    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames written since the last reset.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    /// Responses received since the last reset.
    pub fn responses(&self) -> u64 {
        self.responses.load(Ordering::Acquire)
    }

    /// Events received since the last reset.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Acquire)
    }

    /// Handler failures since the last reset.
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    /// Requests written but not yet answered.
    pub fn outstanding(&self) -> u64 {
        // Load responses first so a concurrent send can only raise the result.
        let responses = self.responses();
        self.sent().saturating_sub(responses)
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.sent.store(0, Ordering::Release);
        self.responses.store(0, Ordering::Release);
        self.events.store(0, Ordering::Release);
        self.handler_failures.store(0, Ordering::Relaxed);
        self.last_frame_ms.store(0, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy.
    pub fn snapshot(&self) -> LinkCountersSnapshot {
        let responses_received = self.responses();
        let messages_sent = self.sent();
        let last_frame_ms = self.last_frame_ms.load(Ordering::Relaxed);

        LinkCountersSnapshot {
            messages_sent,
            responses_received,
            events_received: self.events(),
            outstanding: messages_sent.saturating_sub(responses_received),
            handler_failures: self.handler_failures(),
            last_frame_at: if last_frame_ms > 0 {
                Utc.timestamp_millis_opt(last_frame_ms).single()
            } else {
                None
            },
        }
    }

    fn touch(&self) {
        self.last_frame_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// Serializable copy of [`LinkCounters`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCountersSnapshot {
    /// Frames written.
    pub messages_sent: u64,
    /// Responses received.
    pub responses_received: u64,
    /// Events received.
    pub events_received: u64,
    /// `messages_sent - responses_received`.
    pub outstanding: u64,
    /// Handler invocations that returned an error or panicked.
    pub handler_failures: u64,
    /// Time of the last inbound frame.
    pub last_frame_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_outstanding() {
        let counters = LinkCounters::new();
        counters.record_sent();
        counters.record_sent();
        counters.record_sent();
        counters.record_response();
        counters.record_event();
        assert_eq!(counters.outstanding(), 2);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_sent, 3);
        assert_eq!(snapshot.responses_received, 1);
        assert_eq!(snapshot.events_received, 1);
        assert_eq!(snapshot.outstanding, 2);
        assert!(snapshot.last_frame_at.is_some());
    }

    #[test]
    fn test_outstanding_saturates() {
        let counters = LinkCounters::new();
        counters.record_response();
        assert_eq!(counters.outstanding(), 0);
    }

    #[test]
    fn test_reset() {
        let counters = LinkCounters::new();
        counters.record_sent();
        counters.record_event();
        counters.record_handler_failure();
        counters.reset();
        assert_eq!(counters.snapshot(), LinkCountersSnapshot::default());
    }

    #[test]
    fn test_concurrent_updates() {
        let counters = Arc::new(LinkCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_sent();
                        counters.record_response();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.sent(), 4000);
        assert_eq!(counters.responses(), 4000);
        assert_eq!(counters.outstanding(), 0);
    }
}
