// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! [`BridgeHarness`] wires a [`Supervisor`] to a [`MockChannelFactory`] and
//! registers a [`RecordingHandler`] before anything starts, so the first
//! `Online` status is captured too.

use std::sync::Arc;
use std::time::Duration;

use panelbridge_core::LinkState;
use panelbridge_serial::{LinkOptions, Supervisor};

use super::init_test_logging;
use super::mocks::{MockChannelFactory, MockPanel, RecordingHandler};

/// How long harness helpers wait for a panel to show up.
pub const PANEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Supervisor plus mocks.
pub struct BridgeHarness {
    /// Supervisor under test.
    pub supervisor: Supervisor,
    /// Factory behind the supervisor.
    pub factory: Arc<MockChannelFactory>,
    /// Handler registered before start.
    pub recorder: Arc<RecordingHandler>,
}

impl BridgeHarness {
    /// Harness with the production timing defaults.
    pub fn new() -> Self {
        Self::with_options(LinkOptions::default())
    }

    /// Harness with custom options.
    pub fn with_options(options: LinkOptions) -> Self {
        init_test_logging();
        let factory = MockChannelFactory::new();
        let supervisor =
            Supervisor::new(factory.clone(), options).expect("invalid harness options");
        let recorder = RecordingHandler::new("recorder");
        supervisor.register_handler(recorder.clone());
        Self {
            supervisor,
            factory,
            recorder,
        }
    }

    /// Starts the supervisor and returns the panel end of the first channel.
    pub async fn start(&self) -> MockPanel {
        self.supervisor.start().await.expect("start failed");
        self.next_panel().await
    }

    /// Waits for the panel end of the next opened channel.
    pub async fn next_panel(&self) -> MockPanel {
        self.factory
            .next_panel(PANEL_TIMEOUT)
            .await
            .expect("no channel opened in time")
    }

    /// Waits until the supervisor reports `state`.
    pub async fn wait_for_state(&self, state: LinkState, timeout: Duration) -> bool {
        wait_until(timeout, || self.supervisor.state() == state).await
    }
}

impl Default for BridgeHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `condition` every few milliseconds until it holds or `timeout`
/// elapses. Works on a paused clock.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
