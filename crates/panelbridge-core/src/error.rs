// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for the panel link.
//!
//! Link failures fall into two classes that the supervisor treats very
//! differently:
//!
//! ```text
//! LinkError
//! ├── configuration  - port missing, held by another process, access denied,
//! │                    invalid settings. Surfaced to the caller, never retried.
//! ├── communication  - write/read failure, remote close, stall, open failure.
//! │                    Recoverable: triggers one delayed reconnection.
//! └── caller-side    - queue full, invalid request. Returned to the producer.
//! ```
//!
//! Handler failures use the separate [`HandlerError`] type; they are isolated
//! by the dispatcher and never reach the link state machine.
//!
//! # Examples
//!
//! ```
//! use panelbridge_core::error::LinkError;
//!
//! let error = LinkError::port_not_found("/dev/ttyUSB0");
//! assert!(error.is_configuration());
//! assert!(!error.is_retryable());
//!
//! let error = LinkError::stalled(6, 5);
//! assert!(error.is_communication());
//! assert_eq!(error.error_type(), "stalled");
//! ```

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

// =============================================================================
// ErrorClass
// =============================================================================

/// Broad classification used by the supervisor to decide on recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The port cannot be used with the current settings. Not retried.
    Configuration,
    /// The link failed while in use. Recovered by reconnecting.
    Communication,
    /// The caller passed something the link refuses to accept.
    Caller,
}

// =============================================================================
// LinkError
// =============================================================================

/// Errors raised by the channel, the workers and the request queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    // -------------------------------------------------------------------------
    // Configuration class
    // -------------------------------------------------------------------------
    /// The serial port does not exist.
    #[error("Serial port not found: {port}")]
    PortNotFound {
        /// Port identifier.
        port: String,
    },

    /// The serial port is exclusively held by another process.
    #[error("Serial port is busy: {port}")]
    PortBusy {
        /// Port identifier.
        port: String,
    },

    /// The process lacks permission to open the port.
    #[error("Access denied to serial port: {port}")]
    PortAccessDenied {
        /// Port identifier.
        port: String,
    },

    /// The port rejected the requested settings.
    #[error("Invalid settings for '{port}': {message}")]
    InvalidSettings {
        /// Port identifier (or field name when validating offline).
        port: String,
        /// Description of the rejected setting.
        message: String,
    },

    // -------------------------------------------------------------------------
    // Communication class
    // -------------------------------------------------------------------------
    /// Opening the port failed for a transient reason.
    #[error("Failed to open '{port}': {message}")]
    OpenFailed {
        /// Port identifier.
        port: String,
        /// Underlying failure.
        message: String,
    },

    /// Writing a frame failed.
    #[error("Write failed ({kind:?}): {message}")]
    WriteFailed {
        /// I/O error kind.
        kind: io::ErrorKind,
        /// Underlying failure.
        message: String,
    },

    /// A write did not complete in time.
    #[error("Write did not complete within {timeout:?}")]
    WriteTimeout {
        /// The configured write timeout.
        timeout: Duration,
    },

    /// Reading from the channel failed.
    #[error("Read failed ({kind:?}): {message}")]
    ReadFailed {
        /// I/O error kind.
        kind: io::ErrorKind,
        /// Underlying failure.
        message: String,
    },

    /// The remote end closed the stream.
    #[error("Connection closed by remote end")]
    ConnectionClosed,

    /// Too many requests went unanswered.
    #[error("Link stalled: {outstanding} unanswered requests (threshold {threshold})")]
    Stalled {
        /// `sent - responses` when the stall was detected.
        outstanding: u64,
        /// Configured threshold.
        threshold: u64,
    },

    // -------------------------------------------------------------------------
    // Caller class
    // -------------------------------------------------------------------------
    /// The request queue reached its configured bound.
    #[error("Request queue is full ({capacity} pending)")]
    QueueFull {
        /// Configured bound.
        capacity: usize,
    },

    /// The request payload cannot be framed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Why the payload was refused.
        message: String,
    },

    /// The link was stopped while the operation was in progress.
    #[error("Link is shut down")]
    Shutdown,
}

impl LinkError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a port-not-found error.
    pub fn port_not_found(port: impl Into<String>) -> Self {
        Self::PortNotFound { port: port.into() }
    }

    /// Creates a port-busy error.
    pub fn port_busy(port: impl Into<String>) -> Self {
        Self::PortBusy { port: port.into() }
    }

    /// Creates an access-denied error.
    pub fn access_denied(port: impl Into<String>) -> Self {
        Self::PortAccessDenied { port: port.into() }
    }

    /// Creates an invalid-settings error.
    pub fn invalid_settings(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Creates a transient open failure.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Creates a write failure from an I/O error.
    pub fn write_failed(error: &io::Error) -> Self {
        Self::WriteFailed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Creates a read failure from an I/O error.
    pub fn read_failed(error: &io::Error) -> Self {
        Self::ReadFailed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Creates a stall error.
    pub fn stalled(outstanding: u64, threshold: u64) -> Self {
        Self::Stalled {
            outstanding,
            threshold,
        }
    }

    /// Creates an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Returns the recovery class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PortNotFound { .. }
            | Self::PortBusy { .. }
            | Self::PortAccessDenied { .. }
            | Self::InvalidSettings { .. } => ErrorClass::Configuration,
            Self::OpenFailed { .. }
            | Self::WriteFailed { .. }
            | Self::WriteTimeout { .. }
            | Self::ReadFailed { .. }
            | Self::ConnectionClosed
            | Self::Stalled { .. } => ErrorClass::Communication,
            Self::QueueFull { .. } | Self::InvalidRequest { .. } | Self::Shutdown => {
                ErrorClass::Caller
            }
        }
    }

    /// Returns `true` for errors that abort `start` without retry.
    pub fn is_configuration(&self) -> bool {
        self.class() == ErrorClass::Configuration
    }

    /// Returns `true` for errors recovered by reconnecting.
    pub fn is_communication(&self) -> bool {
        self.class() == ErrorClass::Communication
    }

    /// Returns `true` if the link may recover from this error on its own.
    pub fn is_retryable(&self) -> bool {
        self.is_communication()
    }

    /// Returns `true` if this is a stall.
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::PortNotFound { .. } => "port_not_found",
            Self::PortBusy { .. } => "port_busy",
            Self::PortAccessDenied { .. } => "port_access_denied",
            Self::InvalidSettings { .. } => "invalid_settings",
            Self::OpenFailed { .. } => "open_failed",
            Self::WriteFailed { .. } => "write_failed",
            Self::WriteTimeout { .. } => "write_timeout",
            Self::ReadFailed { .. } => "read_failed",
            Self::ConnectionClosed => "connection_closed",
            Self::Stalled { .. } => "stalled",
            Self::QueueFull { .. } => "queue_full",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Shutdown => "shutdown",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::PortNotFound { port } => format!("시리얼 포트를 찾을 수 없습니다: {}", port),
            Self::PortBusy { port } => {
                format!("시리얼 포트가 다른 프로세스에서 사용 중입니다: {}", port)
            }
            Self::PortAccessDenied { port } => {
                format!("시리얼 포트 접근 권한이 없습니다: {}", port)
            }
            Self::InvalidSettings { port, .. } => format!("시리얼 포트 설정 오류: {}", port),
            Self::OpenFailed { port, .. } => format!("시리얼 포트 열기 실패: {}", port),
            Self::WriteFailed { .. } | Self::WriteTimeout { .. } => {
                "패널로 명령을 전송하지 못했습니다".to_string()
            }
            Self::ReadFailed { .. } | Self::ConnectionClosed => {
                "패널과의 연결이 끊어졌습니다".to_string()
            }
            Self::Stalled { .. } => "패널이 응답하지 않습니다".to_string(),
            Self::QueueFull { .. } => "전송 대기열이 가득 찼습니다".to_string(),
            Self::InvalidRequest { .. } => "잘못된 명령입니다".to_string(),
            Self::Shutdown => "브리지가 종료되었습니다".to_string(),
        }
    }
}

// =============================================================================
// HandlerError
// =============================================================================

/// Error returned by a message handler.
///
/// The dispatcher logs and counts these; they never interrupt delivery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        for error in [
            LinkError::port_not_found("COM3"),
            LinkError::port_busy("COM3"),
            LinkError::access_denied("COM3"),
            LinkError::invalid_settings("COM3", "baud rate"),
        ] {
            assert!(error.is_configuration(), "{error}");
            assert!(!error.is_retryable());
        }
    }

    #[test]
    fn test_communication_class() {
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        for error in [
            LinkError::write_failed(&io),
            LinkError::read_failed(&io),
            LinkError::ConnectionClosed,
            LinkError::stalled(6, 5),
            LinkError::WriteTimeout {
                timeout: Duration::from_secs(5),
            },
            LinkError::open_failed("COM3", "device not ready"),
        ] {
            assert!(error.is_communication(), "{error}");
            assert!(error.is_retryable());
        }
    }

    #[test]
    fn test_caller_class() {
        assert_eq!(LinkError::QueueFull { capacity: 8 }.class(), ErrorClass::Caller);
        assert_eq!(LinkError::invalid_request("x").class(), ErrorClass::Caller);
        assert_eq!(LinkError::Shutdown.class(), ErrorClass::Caller);
    }

    #[test]
    fn test_write_failed_keeps_kind() {
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        match LinkError::write_failed(&io) {
            LinkError::WriteFailed { kind, message } => {
                assert_eq!(kind, io::ErrorKind::BrokenPipe);
                assert_eq!(message, "gone");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let error = LinkError::stalled(7, 5);
        assert_eq!(
            error.to_string(),
            "Link stalled: 7 unanswered requests (threshold 5)"
        );
        assert!(error.is_stall());
    }

    #[test]
    fn test_handler_error_from_str() {
        let error: HandlerError = "boom".into();
        assert_eq!(error.message(), "boom");
        assert_eq!(error.to_string(), "boom");
    }
}
