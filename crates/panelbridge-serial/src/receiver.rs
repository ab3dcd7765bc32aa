// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Receiver worker and stall detection.
//!
//! The receiver reads the input half in bounded slices (the read timeout),
//! so cancellation is observed even when the panel is silent. Partial frames
//! live in the [`FrameDecoder`] and survive those timeouts.
//!
//! For every completed frame:
//!
//! 1. classify it with the [`ResponseResolver`],
//! 2. hand it to the [`Dispatcher`] (which updates the counters),
//! 3. run the [`StallDetector`] against `sent - responses`.
//!
//! End of stream, read errors and stalls end the loop with a communication
//! error for the supervisor.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use panelbridge_core::{
    Dispatcher, FrameDecoder, LinkCounters, LinkError, LinkResult, ResponseResolver,
};

const READ_CHUNK: usize = 256;

// =============================================================================
// StallDetector
// =============================================================================

/// Raises one stall per excursion above the threshold.
///
/// Once raised, the detector stays latched until the outstanding count drops
/// back to the threshold or below.
#[derive(Debug, Clone)]
pub struct StallDetector {
    threshold: u64,
    latched: bool,
}

impl StallDetector {
    /// Creates a detector for `threshold` unanswered requests.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            latched: false,
        }
    }

    /// Checks the counters and returns a stall error on a new excursion.
    pub fn check(&mut self, counters: &LinkCounters) -> Option<LinkError> {
        self.observe(counters.outstanding())
    }

    /// Same as [`check`](Self::check) with an explicit outstanding count.
    pub fn observe(&mut self, outstanding: u64) -> Option<LinkError> {
        if outstanding > self.threshold {
            if self.latched {
                return None;
            }
            self.latched = true;
            Some(LinkError::stalled(outstanding, self.threshold))
        } else {
            self.latched = false;
            None
        }
    }

    /// Returns `true` while a raised stall has not cleared.
    pub fn is_latched(&self) -> bool {
        self.latched
    }
}

// =============================================================================
// Receiver
// =============================================================================

/// Everything the receiver needs besides the input half.
#[derive(Debug, Clone)]
pub struct ReceiverContext {
    /// Frame classifier.
    pub resolver: Arc<ResponseResolver>,
    /// Handler fan-out.
    pub dispatcher: Arc<Dispatcher>,
    /// Shared counters.
    pub counters: Arc<LinkCounters>,
    /// Stall threshold.
    pub stall_threshold: u64,
    /// Upper bound of a single read.
    pub read_timeout: Duration,
    /// Frame length bound.
    pub max_frame_len: usize,
    /// Session cancellation.
    pub cancel: CancellationToken,
}

/// Runs the receiver until cancelled (`Ok`) or until the link fails (`Err`).
pub async fn run_receiver<R>(mut reader: R, ctx: ReceiverContext) -> LinkResult<()>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::with_max_frame_len(ctx.max_frame_len);
    let mut stall = StallDetector::new(ctx.stall_threshold);
    let mut buf = [0u8; READ_CHUNK];

    tracing::debug!("Receiver started");

    loop {
        let read = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            read = tokio::time::timeout(ctx.read_timeout, reader.read(&mut buf)) => read,
        };

        let n = match read {
            Err(_elapsed) => {
                tracing::trace!(pending = decoder.pending_len(), "Read timed out");
                continue;
            }
            Ok(Ok(0)) => {
                tracing::warn!("Channel closed by remote end");
                return Err(LinkError::ConnectionClosed);
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read from channel");
                return Err(LinkError::read_failed(&e));
            }
        };

        tracing::trace!(bytes = ?&buf[..n], "Read bytes");

        for frame in decoder.push(&buf[..n]) {
            let message = ctx.resolver.resolve(&frame);
            tracing::debug!(frame = %frame, kind = ?message.kind(), "Received frame");
            ctx.dispatcher.dispatch(&message);

            if let Some(error) = stall.check(&ctx.counters) {
                tracing::warn!(
                    outstanding = ctx.counters.outstanding(),
                    threshold = ctx.stall_threshold,
                    "Link stalled"
                );
                return Err(error);
            }
        }
    }

    tracing::debug!("Receiver cancelled");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
