// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Link state machine and health reporting types.
//!
//! ```text
//!                 start()                 open ok
//!  Disconnected ──────────▶ Connecting ────────────▶ Connected
//!       ▲                     │    ▲                   │
//!       │ stop()   config err │    │ delay elapsed     │ I/O error / stall
//!       │                     ▼    │                   ▼
//!       │          ConfigurationError   ReconnectScheduled ◀── IoError | Stalled
//!       └──────────────────── (from any state) ──────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::counters::LinkCountersSnapshot;

// =============================================================================
// LinkState
// =============================================================================

/// Connection state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Not running.
    #[default]
    Disconnected,
    /// Opening the channel.
    Connecting,
    /// Channel open, sender and receiver running.
    Connected,
    /// Too many unanswered requests.
    Stalled,
    /// A read or write failed.
    IoError,
    /// Waiting for the reconnection delay to elapse.
    ReconnectScheduled,
    /// The port cannot be opened with the current settings.
    ConfigurationError,
}

impl LinkState {
    /// Returns `true` if the link can carry traffic.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` while recovering from a communication failure.
    pub fn is_recovering(&self) -> bool {
        matches!(
            self,
            Self::Stalled | Self::IoError | Self::ReconnectScheduled
        )
    }

    /// Collapses the state into the status shown to the owner.
    pub fn status(&self) -> HealthStatus {
        match self {
            Self::Connected => HealthStatus::Connected,
            Self::Connecting => HealthStatus::Connecting,
            Self::Stalled | Self::IoError | Self::ReconnectScheduled => {
                HealthStatus::CommunicationError
            }
            Self::ConfigurationError => HealthStatus::ConfigurationError,
            Self::Disconnected => HealthStatus::Offline,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Stalled => "stalled",
            Self::IoError => "io_error",
            Self::ReconnectScheduled => "reconnect_scheduled",
            Self::ConfigurationError => "configuration_error",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// HealthStatus
// =============================================================================

/// Owner-facing health summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Link is up.
    Connected,
    /// First connection attempt in progress.
    Connecting,
    /// Link failed and is recovering on its own.
    CommunicationError,
    /// Link cannot start with the current configuration.
    ConfigurationError,
    /// Link is stopped.
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::CommunicationError => "communication_error",
            Self::ConfigurationError => "configuration_error",
            Self::Offline => "offline",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// LinkHealth
// =============================================================================

/// Point-in-time health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkHealth {
    /// Detailed state.
    pub state: LinkState,
    /// Summary status.
    pub status: HealthStatus,
    /// Channel description (usually the port name).
    pub channel: String,
    /// Type label of the last link error.
    pub last_error_type: Option<String>,
    /// Message of the last link error.
    pub last_error: Option<String>,
    /// Reconnection attempts since `start`.
    pub reconnect_attempts: u64,
    /// Requests waiting to be written.
    pub pending_requests: usize,
    /// When the current connection was established.
    pub connected_since: Option<DateTime<Utc>>,
    /// Message counters of the current connection.
    pub counters: LinkCountersSnapshot,
}
