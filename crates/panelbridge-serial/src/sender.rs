// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sender worker.
//!
//! Drains the request queue one request at a time:
//!
//! ```text
//!  ┌──────────────┐   ┌──────────────┐   ┌────────┐   ┌──────────────┐
//!  │ pop (waits)  │──▶│ write+flush  │──▶│ sent++ │──▶│ sleep spacing│──┐
//!  └──────────────┘   └──────────────┘   └────────┘   └──────────────┘  │
//!         ▲                                                              │
//!         └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is observed while waiting for a request and while sleeping.
//! A write that has started runs to completion (bounded by the write
//! timeout), so cancellation never leaves a partial frame on the wire.
//!
//! On a failed write the request is dropped, not re-queued: delivery is at
//! most once and retrying is up to the producer.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use panelbridge_core::{LinkCounters, LinkError, LinkResult, Request, RequestQueue};

/// Everything the sender needs besides the output half.
#[derive(Debug, Clone)]
pub struct SenderContext {
    /// Source of requests.
    pub queue: Arc<RequestQueue>,
    /// `sent` is incremented after every completed write.
    pub counters: Arc<LinkCounters>,
    /// Minimum spacing between two writes.
    pub spacing: Duration,
    /// Upper bound of one write.
    pub write_timeout: Duration,
    /// Session cancellation.
    pub cancel: CancellationToken,
}

/// Runs the sender until cancelled (`Ok`) or until a write fails (`Err`).
pub async fn run_sender<W>(mut writer: W, ctx: SenderContext) -> LinkResult<()>
where
    W: AsyncWrite + Unpin,
{
    tracing::debug!("Sender started");

    loop {
        let request = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            request = ctx.queue.pop() => request,
        };

        match tokio::time::timeout(ctx.write_timeout, write_frame(&mut writer, &request)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(request = %request, error = %e, "Failed to write request");
                return Err(LinkError::write_failed(&e));
            }
            Err(_) => {
                tracing::warn!(
                    request = %request,
                    timeout = ?ctx.write_timeout,
                    "Write timed out"
                );
                return Err(LinkError::WriteTimeout {
                    timeout: ctx.write_timeout,
                });
            }
        }

        let sent = ctx.counters.record_sent();
        tracing::debug!(request = %request, sent, "Sent request");

        if !ctx.spacing.is_zero() {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => break,
                _ = tokio::time::sleep(ctx.spacing) => {}
            }
        }
    }

    tracing::debug!("Sender cancelled");
    Ok(())
}

async fn write_frame<W>(writer: &mut W, request: &Request) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    tracing::trace!(bytes = ?request.wire_bytes(), "Writing frame");
    writer.write_all(request.wire_bytes()).await?;
    writer.flush().await
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::AsyncReadExt;
    use tokio::time::Instant;

    fn context(queue: Arc<RequestQueue>, counters: Arc<LinkCounters>) -> SenderContext {
        SenderContext {
            queue,
            counters,
            spacing: Duration::from_millis(150),
            write_timeout: Duration::from_secs(5),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_in_order_with_spacing() {
        let queue = Arc::new(RequestQueue::unbounded());
        let counters = Arc::new(LinkCounters::new());
        for i in 0..5 {
            queue.push(Request::new(format!("R{i}")).unwrap()).unwrap();
        }

        let (local, mut remote) = tokio::io::duplex(256);
        let ctx = context(Arc::clone(&queue), Arc::clone(&counters));
        let cancel = ctx.cancel.clone();
        let task = tokio::spawn(run_sender(local, ctx));

        let mut frames = Vec::new();
        let mut stamps = Vec::new();
        let mut current = Vec::new();
        let mut byte = [0u8; 1];
        while frames.len() < 5 {
            remote.read_exact(&mut byte).await.unwrap();
            if byte[0] == b'\r' {
                stamps.push(Instant::now());
                frames.push(String::from_utf8(std::mem::take(&mut current)).unwrap());
            } else {
                current.push(byte[0]);
            }
        }

        assert_eq!(frames, vec!["R0", "R1", "R2", "R3", "R4"]);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(150));
        }

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
        assert_eq!(counters.sent(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_for_request() {
        let queue = Arc::new(RequestQueue::unbounded());
        let (local, _remote) = tokio::io::duplex(64);
        let ctx = context(queue, Arc::new(LinkCounters::new()));
        let cancel = ctx.cancel.clone();
        let task = tokio::spawn(run_sender(local, ctx));

        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_millis(10), task)
            .await
            .expect("sender should exit promptly");
        assert!(result.unwrap().is_ok());
    }

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_and_not_requeued() {
        let queue = Arc::new(RequestQueue::unbounded());
        queue.push(Request::new("ARM").unwrap()).unwrap();
        queue.push(Request::new("NEXT").unwrap()).unwrap();
        let counters = Arc::new(LinkCounters::new());

        let result = run_sender(BrokenWriter, context(Arc::clone(&queue), Arc::clone(&counters))).await;

        assert!(matches!(
            result,
            Err(LinkError::WriteFailed {
                kind: io::ErrorKind::BrokenPipe,
                ..
            })
        ));
        assert_eq!(counters.sent(), 0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_pop().unwrap().payload(), "NEXT");
    }

    struct StuckWriter;

    impl AsyncWrite for StuckWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_timeout() {
        let queue = Arc::new(RequestQueue::unbounded());
        queue.push(Request::new("ARM").unwrap()).unwrap();

        let result = run_sender(StuckWriter, context(queue, Arc::new(LinkCounters::new()))).await;
        assert_eq!(
            result,
            Err(LinkError::WriteTimeout {
                timeout: Duration::from_secs(5)
            })
        );
    }
}
