// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Classified messages delivered to handlers.
//!
//! Every inbound frame becomes exactly one [`ClassifiedMessage`]: either an
//! unsolicited [`PanelEvent`] or a [`PanelResponse`] to an earlier request.
//! The supervisor adds synthetic [`LinkStatus`] messages so handlers can track
//! link health from the same stream.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ClassifiedMessage
// =============================================================================

/// A message fanned out by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedMessage {
    /// Unsolicited panel notification.
    Event(PanelEvent),
    /// Reply to a prior request, correlated by position only.
    Response(PanelResponse),
    /// Link health, generated locally.
    Status(LinkStatus),
}

impl ClassifiedMessage {
    /// Returns the message kind.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Event(_) => MessageKind::Event,
            Self::Response(_) => MessageKind::Response,
            Self::Status(_) => MessageKind::Status,
        }
    }

    /// Returns `true` for panel events.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Returns `true` for panel responses, including unknown ones.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Returns the frame this message was built from, if it came off the wire.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Event(event) => Some(&event.raw),
            Self::Response(response) => Some(response.raw()),
            Self::Status(_) => None,
        }
    }
}

impl fmt::Display for ClassifiedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => write!(f, "event {}", event.raw),
            Self::Response(response) => write!(f, "response {}", response.raw()),
            Self::Status(status) => write!(f, "status {}", status),
        }
    }
}

/// Discriminant of [`ClassifiedMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Panel event.
    Event,
    /// Panel response.
    Response,
    /// Link status.
    Status,
}

// =============================================================================
// PanelEvent
// =============================================================================

/// An unsolicited notification from the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelEvent {
    /// Event code (first token after the event marker).
    pub code: String,
    /// Remaining whitespace-separated tokens.
    pub args: Vec<String>,
    /// Original frame text.
    pub raw: String,
}

// =============================================================================
// PanelResponse
// =============================================================================

/// A reply to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelResponse {
    /// A well-formed reply.
    Reply {
        /// Reply code.
        code: String,
        /// Remaining tokens.
        args: Vec<String>,
        /// Original frame text.
        raw: String,
    },
    /// The panel rejected the request.
    Error {
        /// Tokens following the error code.
        args: Vec<String>,
        /// Original frame text.
        raw: String,
    },
    /// A frame that did not parse. Still counted as a response.
    Unknown {
        /// Original frame text.
        raw: String,
    },
}

impl PanelResponse {
    /// Returns the original frame text.
    pub fn raw(&self) -> &str {
        match self {
            Self::Reply { raw, .. } | Self::Error { raw, .. } | Self::Unknown { raw } => raw,
        }
    }

    /// Returns the reply code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Reply { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns `true` if the panel signalled an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns `true` if the frame could not be parsed.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

// =============================================================================
// LinkStatus
// =============================================================================

/// Synthetic link health message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    /// The channel is open and both workers are running.
    Online,
    /// Communication failed; a reconnection is scheduled.
    Failure {
        /// Error type label.
        error_type: String,
        /// Human readable reason.
        reason: String,
    },
    /// The link was stopped.
    Offline,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Failure { reason, .. } => write!(f, "failure: {}", reason),
            Self::Offline => write!(f, "offline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_raw() {
        let event = ClassifiedMessage::Event(PanelEvent {
            code: "ZN".into(),
            args: vec!["3".into()],
            raw: "!ZN 3".into(),
        });
        assert_eq!(event.kind(), MessageKind::Event);
        assert_eq!(event.raw(), Some("!ZN 3"));
        assert!(event.is_event() && !event.is_response());

        let status = ClassifiedMessage::Status(LinkStatus::Online);
        assert_eq!(status.kind(), MessageKind::Status);
        assert_eq!(status.raw(), None);
    }

    #[test]
    fn test_serialize_tagged() {
        let message = ClassifiedMessage::Response(PanelResponse::Unknown { raw: "??".into() });
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["kind"], "response");
        assert_eq!(json["type"], "unknown");
        assert_eq!(json["raw"], "??");
    }
}
