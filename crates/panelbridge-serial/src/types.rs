// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Serial port settings and link timing options.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use panelbridge_core::codec::DEFAULT_MAX_FRAME_LEN;
use panelbridge_core::{LinkError, LinkResult};

/// Standard baud rates accepted by [`SerialSettings::validate`].
pub const VALID_BAUD_RATES: &[u32] = &[
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

// =============================================================================
// SerialSettings
// =============================================================================

/// How to open the serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Port identifier (`/dev/ttyUSB0`, `COM3`, ...).
    #[serde(default)]
    pub port: String,

    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits.
    #[serde(default)]
    pub data_bits: DataBits,

    /// Parity.
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits.
    #[serde(default)]
    pub stop_bits: StopBits,

    /// Flow control.
    #[serde(default)]
    pub flow_control: FlowControl,

    /// Request exclusive access (TIOCEXCL) on Unix.
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_exclusive() -> bool {
    true
}

impl SerialSettings {
    /// Creates settings for `port` with defaults (9600 8N1).
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    /// Sets the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Validates the settings without touching the port.
    pub fn validate(&self) -> LinkResult<()> {
        if self.port.trim().is_empty() {
            return Err(LinkError::invalid_settings("port", "port must be set"));
        }
        if !VALID_BAUD_RATES.contains(&self.baud_rate) {
            return Err(LinkError::invalid_settings(
                "baud_rate",
                format!("unsupported baud rate {} for {}", self.baud_rate, self.port),
            ));
        }
        Ok(())
    }

    /// Short description such as `/dev/ttyUSB0@9600/8N1`.
    pub fn describe(&self) -> String {
        format!(
            "{}@{}/{}{}{}",
            self.port,
            self.baud_rate,
            self.data_bits,
            self.parity.char(),
            self.stop_bits
        )
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
            exclusive: default_exclusive(),
        }
    }
}

/// Data bits configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    /// 7 data bits.
    Seven,
    /// 8 data bits (default).
    #[default]
    Eight,
}

impl DataBits {
    /// Returns the number of bits.
    pub const fn bits(&self) -> u8 {
        match self {
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(value: DataBits) -> Self {
        match value {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Parity configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity (default).
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

impl Parity {
    /// Returns the short character representation.
    pub const fn char(&self) -> char {
        match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(value: Parity) -> Self {
        match value {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Stop bits configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    /// 1 stop bit (default).
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "1"),
            Self::Two => write!(f, "2"),
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Flow control configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    /// No flow control (default).
    #[default]
    None,
    /// XON/XOFF.
    Software,
    /// RTS/CTS.
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(value: FlowControl) -> Self {
        match value {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

// =============================================================================
// LinkOptions
// =============================================================================

/// Timing and sizing of the link.
///
/// The defaults (150 ms spacing, threshold 5, one minute reconnect delay)
/// are empirical values for the panel, not protocol requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOptions {
    /// Minimum time between two writes.
    #[serde(default = "default_send_spacing")]
    #[serde(with = "humantime_serde")]
    pub send_spacing: Duration,

    /// Unanswered requests tolerated before the link counts as stalled.
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u64,

    /// Delay before reconnecting after a communication error.
    #[serde(default = "default_reconnect_delay")]
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,

    /// Upper bound of a single read, so cancellation is observed promptly.
    #[serde(default = "default_read_timeout")]
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Upper bound of a single frame write.
    #[serde(default = "default_write_timeout")]
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// How long `stop` waits for the workers before aborting them.
    #[serde(default = "default_shutdown_timeout")]
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Inbound frames longer than this are cut.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,

    /// Optional bound of the request queue.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending: Option<usize>,
}

fn default_send_spacing() -> Duration {
    Duration::from_millis(150)
}

fn default_stall_threshold() -> u64 {
    5
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_write_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            send_spacing: default_send_spacing(),
            stall_threshold: default_stall_threshold(),
            reconnect_delay: default_reconnect_delay(),
            read_timeout: default_read_timeout(),
            write_timeout: default_write_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            max_frame_len: default_max_frame_len(),
            max_pending: None,
        }
    }
}

impl LinkOptions {
    /// Sets the send spacing.
    pub fn with_send_spacing(mut self, spacing: Duration) -> Self {
        self.send_spacing = spacing;
        self
    }

    /// Sets the stall threshold.
    pub fn with_stall_threshold(mut self, threshold: u64) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Sets the reconnection delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Bounds the request queue.
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }

    /// Validates the options.
    pub fn validate(&self) -> LinkResult<()> {
        if self.stall_threshold == 0 {
            return Err(LinkError::invalid_settings(
                "stall_threshold",
                "must be at least 1",
            ));
        }
        for (field, value) in [
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
            ("shutdown_timeout", self.shutdown_timeout),
        ] {
            if value.is_zero() {
                return Err(LinkError::invalid_settings(field, "must be greater than zero"));
            }
        }
        if self.max_frame_len == 0 {
            return Err(LinkError::invalid_settings(
                "max_frame_len",
                "must be greater than zero",
            ));
        }
        if self.max_pending == Some(0) {
            return Err(LinkError::invalid_settings(
                "max_pending",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }
}
