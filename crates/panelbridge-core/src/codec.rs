// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Wire framing for the panel protocol.
//!
//! Every message on the wire is ASCII text followed by a single carriage
//! return (0x0D). There is no length prefix, checksum or message identifier.
//!
//! ```text
//!  outbound:  Request("ZS 1")  ──encode──▶  5A 53 20 31 0D
//!
//!  inbound:   .. 21 5A 4E 20 33 0D 4F 4B 0D 45 ..
//!                └──── "!ZN 3" ──┘ └"OK"┘ └ partial, kept
//! ```
//!
//! The decoder is incremental: bytes may arrive in any chunking and a
//! partial frame stays buffered until its delimiter shows up.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, LinkResult};

/// Frame terminator byte.
pub const FRAME_DELIMITER: u8 = 0x0D;

/// Default upper bound for a single inbound frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

const LINE_FEED: u8 = 0x0A;

// =============================================================================
// Request
// =============================================================================

/// A fully encoded outbound request.
///
/// Immutable once built. The queue hands each request to the sender exactly
/// once and drops it after the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    payload: String,
    wire: Vec<u8>,
}

impl Request {
    /// Builds a request from an ASCII payload.
    ///
    /// Leading and trailing whitespace is kept as-is. Payloads that are empty,
    /// contain non-ASCII bytes or contain a line terminator are refused since
    /// they cannot be carried in a single frame.
    pub fn new(payload: impl Into<String>) -> LinkResult<Self> {
        let payload = payload.into();

        if payload.is_empty() {
            return Err(LinkError::invalid_request("payload is empty"));
        }
        if !payload.is_ascii() {
            return Err(LinkError::invalid_request("payload is not ASCII"));
        }
        if payload
            .bytes()
            .any(|b| b == FRAME_DELIMITER || b == LINE_FEED)
        {
            return Err(LinkError::invalid_request(
                "payload contains a line terminator",
            ));
        }

        let wire = encode(&payload);
        Ok(Self { payload, wire })
    }

    /// Returns the payload without the delimiter.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns the bytes written to the channel.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.wire
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)
    }
}

/// Encodes a payload into its wire form.
pub fn encode(payload: &str) -> Vec<u8> {
    let mut wire = Vec::with_capacity(payload.len() + 1);
    wire.extend_from_slice(payload.as_bytes());
    wire.push(FRAME_DELIMITER);
    wire
}

// =============================================================================
// RawFrame
// =============================================================================

/// A decoded but unclassified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFrame(String);

impl RawFrame {
    /// Wraps a frame string.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the frame text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the frame and returns its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// FrameDecoder
// =============================================================================

/// Incremental delimiter scanner.
///
/// Emits exactly one [`RawFrame`] per delimiter seen on the wire, so every
/// reply the panel sends is counted once downstream. A delimiter closing an
/// empty (or blank) buffer yields an empty frame.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_frame_len: usize,
    /// Set after an oversized frame was emitted; bytes are dropped until
    /// the next delimiter.
    discarding: bool,
    oversized: u64,
}

impl FrameDecoder {
    /// Creates a decoder with the default frame bound.
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a decoder that cuts frames longer than `max_frame_len` bytes.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(128),
            max_frame_len: max_frame_len.max(1),
            discarding: false,
            oversized: 0,
        }
    }

    /// Feeds bytes and returns every frame completed by them.
    ///
    /// Line feeds are dropped and text is decoded as lossy UTF-8 and
    /// trimmed. A frame growing past the bound is emitted truncated as soon
    /// as the bound is crossed; the rest of it, up to its delimiter, is
    /// thrown away.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();

        for &byte in bytes {
            match byte {
                FRAME_DELIMITER if self.discarding => self.discarding = false,
                FRAME_DELIMITER => frames.push(self.take_frame()),
                LINE_FEED => {}
                _ if self.discarding => {}
                _ if self.buffer.len() == self.max_frame_len => {
                    self.oversized += 1;
                    tracing::warn!(
                        max_frame_len = self.max_frame_len,
                        "Inbound frame exceeded maximum length, truncating"
                    );
                    frames.push(self.take_frame());
                    self.discarding = true;
                }
                _ => self.buffer.push(byte),
            }
        }

        frames
    }

    /// Returns the number of buffered bytes of the current partial frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns how many frames were truncated at the length bound.
    pub fn oversized_frames(&self) -> u64 {
        self.oversized
    }

    /// Discards any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    fn take_frame(&mut self) -> RawFrame {
        let frame = RawFrame::new(String::from_utf8_lossy(&self.buffer).trim());
        self.buffer.clear();
        frame
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
