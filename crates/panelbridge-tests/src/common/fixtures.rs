// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Panel traffic and configuration documents shared by the suites.

// =============================================================================
// Panel Frames
// =============================================================================

/// Frames a panel would send.
pub struct PanelFrames;

impl PanelFrames {
    /// Plain acknowledgement.
    pub const OK: &'static str = "OK";

    /// Zone state change event.
    pub fn zone_event(zone: usize) -> String {
        format!("!ZN {zone} OPEN")
    }

    /// Reply to a zone status request.
    pub fn zone_status(zone: usize) -> String {
        format!("ZS {zone} READY")
    }

    /// Error reply.
    pub fn error(code: u32) -> String {
        format!("ERR {code}")
    }

    /// A frame the resolver cannot parse.
    pub fn garbage() -> &'static str {
        "#?%"
    }
}

/// Requests the bridge sends to the panel.
pub struct PanelRequests;

impl PanelRequests {
    /// Zone status request.
    pub fn zone_status(zone: usize) -> String {
        format!("ZS {zone}")
    }

    /// `count` distinct zone status requests.
    pub fn batch(count: usize) -> Vec<String> {
        (1..=count).map(Self::zone_status).collect()
    }
}

// =============================================================================
// Configuration Documents
// =============================================================================

/// Configuration documents in every supported format.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Complete YAML configuration.
    pub fn yaml() -> &'static str {
        r#"
serial:
  port: /dev/ttyUSB0
  baud_rate: 19200
link:
  send_spacing: 200ms
  stall_threshold: 3
  reconnect_delay: 30s
  max_pending: 64
resolver:
  event_marker: "!"
  error_code: ERR
logging:
  level: debug
  format: json
"#
    }

    /// Complete TOML configuration.
    pub fn toml() -> &'static str {
        r#"
[serial]
port = "COM3"
baud_rate = 9600

[link]
send_spacing = "150ms"
reconnect_delay = "1m"

[logging]
level = "warn"
"#
    }

    /// Minimal JSON configuration.
    pub fn json() -> &'static str {
        r#"{ "serial": { "port": "/dev/ttyS1" } }"#
    }

    /// YAML without a port.
    pub fn yaml_without_port() -> &'static str {
        "link:\n  stall_threshold: 5\n"
    }
}
