// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions

use std::time::Duration;

use tokio::time::Instant;

use panelbridge_core::{HealthStatus, LinkCountersSnapshot, LinkHealth, LinkState};

// =============================================================================
// Timing Assertions
// =============================================================================

/// Asserts that consecutive readings are at least `min` apart.
pub fn assert_min_spacing(times: &[Instant], min: Duration) {
    for (i, pair) in times.windows(2).enumerate() {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= min,
            "Gap between #{} and #{} was {:?}, expected at least {:?}",
            i,
            i + 1,
            gap,
            min
        );
    }
}

// =============================================================================
// Health Assertions
// =============================================================================

/// Assertion extensions for [`LinkHealth`].
pub trait HealthAssertions {
    /// Asserts state and derived status.
    fn assert_state(&self, state: LinkState, status: HealthStatus);

    /// Asserts the last recorded error type.
    fn assert_last_error_type(&self, expected: &str);
}

impl HealthAssertions for LinkHealth {
    fn assert_state(&self, state: LinkState, status: HealthStatus) {
        assert_eq!(self.state, state, "unexpected link state in {:?}", self);
        assert_eq!(self.status, status, "unexpected health status in {:?}", self);
    }

    fn assert_last_error_type(&self, expected: &str) {
        assert_eq!(
            self.last_error_type.as_deref(),
            Some(expected),
            "unexpected last error in {:?}",
            self
        );
    }
}

/// Assertion extensions for [`LinkCountersSnapshot`].
pub trait CounterAssertions {
    /// Asserts sent, responses and events at once.
    fn assert_counts(&self, sent: u64, responses: u64, events: u64);
}

impl CounterAssertions for LinkCountersSnapshot {
    fn assert_counts(&self, sent: u64, responses: u64, events: u64) {
        assert_eq!(
            (
                self.messages_sent,
                self.responses_received,
                self.events_received
            ),
            (sent, responses, events),
            "(sent, responses, events) mismatch in {:?}",
            self
        );
    }
}
