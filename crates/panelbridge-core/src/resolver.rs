// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Frame classification.
//!
//! [`ResponseResolver::resolve`] is total: any frame maps to a message, and
//! frames that do not parse become [`PanelResponse::Unknown`] so that the
//! sent/received balance used for stall detection stays intact.
//!
//! # Grammar
//!
//! ```text
//! frame    := event | reply | unknown
//! event    := MARKER code (WS arg)*          e.g. "!ZN 3 OPEN"
//! reply    := code (WS arg)*                 e.g. "OK", "ZS 1 ARMED"
//! error    := ERROR_CODE (WS arg)*           e.g. "ERR 12"
//! code     := [A-Za-z0-9_-]+
//! ```
//!
//! The event marker defaults to `!` and the error code to `ERR`; both are
//! configurable through [`ResolverOptions`].

use serde::{Deserialize, Serialize};

use crate::codec::RawFrame;
use crate::message::{ClassifiedMessage, PanelEvent, PanelResponse};

/// Options for [`ResponseResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Prefix that marks unsolicited events.
    #[serde(default = "default_event_marker")]
    pub event_marker: String,

    /// Reply code that marks a rejected request (case-insensitive).
    #[serde(default = "default_error_code")]
    pub error_code: String,
}

fn default_event_marker() -> String {
    "!".to_string()
}

fn default_error_code() -> String {
    "ERR".to_string()
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            event_marker: default_event_marker(),
            error_code: default_error_code(),
        }
    }
}

impl ResolverOptions {
    /// Checks that both markers are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_marker.is_empty() {
            return Err("event_marker must not be empty".to_string());
        }
        if self.event_marker.chars().any(char::is_whitespace) {
            return Err("event_marker must not contain whitespace".to_string());
        }
        if !is_code(&self.error_code) {
            return Err(format!("error_code '{}' is not a valid code", self.error_code));
        }
        Ok(())
    }
}

// =============================================================================
// ResponseResolver
// =============================================================================

/// Maps raw frames to classified messages.
#[derive(Debug, Clone, Default)]
pub struct ResponseResolver {
    options: ResolverOptions,
}

impl ResponseResolver {
    /// Creates a resolver.
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// Returns the resolver options.
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Classifies one frame. Never fails.
    pub fn resolve(&self, frame: &RawFrame) -> ClassifiedMessage {
        let raw = frame.as_str();
        let text = raw.trim();

        if let Some(rest) = text.strip_prefix(self.options.event_marker.as_str()) {
            let mut tokens = rest.split_whitespace();
            return match tokens.next() {
                Some(code) if is_code(code) => ClassifiedMessage::Event(PanelEvent {
                    code: code.to_string(),
                    args: tokens.map(str::to_string).collect(),
                    raw: raw.to_string(),
                }),
                _ => unknown(raw),
            };
        }

        let mut tokens = text.split_whitespace();
        match tokens.next() {
            Some(code) if is_code(code) => {
                let args = tokens.map(str::to_string).collect();
                if code.eq_ignore_ascii_case(&self.options.error_code) {
                    ClassifiedMessage::Response(PanelResponse::Error {
                        args,
                        raw: raw.to_string(),
                    })
                } else {
                    ClassifiedMessage::Response(PanelResponse::Reply {
                        code: code.to_string(),
                        args,
                        raw: raw.to_string(),
                    })
                }
            }
            _ => unknown(raw),
        }
    }
}

fn unknown(raw: &str) -> ClassifiedMessage {
    ClassifiedMessage::Response(PanelResponse::Unknown {
        raw: raw.to_string(),
    })
}

fn is_code(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// =============================================================================
// Tests
// =============================================================================
