// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process shutdown.
//!
//! [`ShutdownCoordinator`] fires once, either on a termination signal from the
//! OS or on [`ShutdownCoordinator::initiate_shutdown`]. Tasks hold a
//! [`ShutdownSignal`] and select on it next to their own work.

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{info, warn};

/// One-shot shutdown trigger shared by the runtime's tasks.
///
/// Clones share the same trigger.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Untriggered coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a task that should stop on shutdown.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            token: self.token.clone(),
        }
    }

    /// Fires the trigger. Later calls do nothing.
    pub fn initiate_shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Shutdown requested");
            self.token.cancel();
        }
    }

    /// Whether the trigger has fired.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns once the process is asked to terminate or
    /// [`initiate_shutdown`](Self::initiate_shutdown) is called.
    pub async fn wait_for_shutdown(&self) {
        tokio::select! {
            _ = termination_requested() => self.initiate_shutdown(),
            _ = self.token.cancelled() => {}
        }
    }
}

/// Resolves on SIGTERM, SIGINT or SIGQUIT (Ctrl+C off Unix).
///
/// Pends forever when the handlers cannot be installed, leaving manual
/// shutdown as the only way out.
async fn termination_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{Signal, SignalKind, signal};

        let kinds = [
            ("SIGTERM", SignalKind::terminate()),
            ("SIGINT", SignalKind::interrupt()),
            ("SIGQUIT", SignalKind::quit()),
        ];
        let mut streams: Vec<(&str, Signal)> = Vec::with_capacity(kinds.len());
        for (name, kind) in kinds {
            match signal(kind) {
                Ok(stream) => streams.push((name, stream)),
                Err(error) => warn!(signal = name, error = %error, "Cannot listen for signal"),
            }
        }
        if streams.is_empty() {
            return std::future::pending().await;
        }

        let received = std::future::poll_fn(|cx| {
            for (name, stream) in streams.iter_mut() {
                if stream.poll_recv(cx).is_ready() {
                    return std::task::Poll::Ready(*name);
                }
            }
            std::task::Poll::Pending
        })
        .await;
        info!(signal = received, "Termination signal received");
    }

    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "Cannot listen for Ctrl+C");
            return std::future::pending().await;
        }
        info!(signal = "ctrl_c", "Termination signal received");
    }
}

/// Task-side view of a [`ShutdownCoordinator`].
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Whether the trigger has fired.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been initiated, immediately if it already was.
    pub fn wait(self) -> WaitForCancellationFutureOwned {
        self.token.cancelled_owned()
    }
}
