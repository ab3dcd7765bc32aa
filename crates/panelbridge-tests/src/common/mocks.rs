// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! - [`MockChannelFactory`]: opens in-memory channels, with injectable open
//!   failures, and hands the far end of each one to the test as a
//!   [`MockPanel`].
//! - [`MockPanel`]: the panel side of a channel. Reads CR-terminated
//!   requests, writes replies and events, breaks the bridge's output half.
//! - [`RecordingHandler`], [`FailingHandler`], [`PanickingHandler`]:
//!   message handlers for dispatch tests.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::Instant;

use panelbridge_core::{
    ClassifiedMessage, FrameDecoder, HandlerError, LinkError, LinkResult, LinkStatus,
    MessageHandler, PanelEvent, PanelResponse,
};
use panelbridge_serial::{Channel, ChannelFactory};

const DUPLEX_BUFFER: usize = 4096;

// =============================================================================
// Mock Channel Factory
// =============================================================================

/// Channel factory backed by `tokio::io::duplex`.
#[derive(Debug)]
pub struct MockChannelFactory {
    /// Number of `open` calls, failed ones included.
    opens: AtomicU64,

    /// Clock reading of every `open` call.
    open_times: Mutex<Vec<Instant>>,

    /// Errors returned by the next `open` calls, in order.
    failures: Mutex<VecDeque<LinkError>>,

    panels_tx: mpsc::UnboundedSender<MockPanel>,
    panels_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockPanel>>,
}

impl MockChannelFactory {
    /// Creates a factory whose opens succeed.
    pub fn new() -> Arc<Self> {
        let (panels_tx, panels_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            opens: AtomicU64::new(0),
            open_times: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            panels_tx,
            panels_rx: tokio::sync::Mutex::new(panels_rx),
        })
    }

    /// Makes the next `open` fail with `error`. Calls queue up.
    pub fn fail_next(&self, error: LinkError) {
        self.failures.lock().push_back(error);
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Clock readings of every `open` call.
    pub fn open_times(&self) -> Vec<Instant> {
        self.open_times.lock().clone()
    }

    /// Waits for the panel end of the next successfully opened channel.
    pub async fn next_panel(&self, timeout: Duration) -> Option<MockPanel> {
        let mut rx = self.panels_rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }
}

#[async_trait]
impl ChannelFactory for MockChannelFactory {
    async fn open(&self) -> LinkResult<Channel> {
        let index = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        self.open_times.lock().push(Instant::now());

        if let Some(error) = self.failures.lock().pop_front() {
            tracing::debug!(index, error = %error, "Mock open failing");
            return Err(error);
        }

        let (bridge, panel) = tokio::io::duplex(DUPLEX_BUFFER);
        let (reader, writer) = tokio::io::split(bridge);
        let fault = Arc::new(AtomicBool::new(false));
        let writer = FaultyWriter {
            inner: writer,
            fault: Arc::clone(&fault),
        };

        let _ = self.panels_tx.send(MockPanel::new(index, panel, fault));
        Ok(Channel::new(format!("mock-{index}"), reader, writer))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

// =============================================================================
// Faulty Writer
// =============================================================================

/// Output half that fails every write once its fault flag is raised.
struct FaultyWriter<W> {
    inner: W,
    fault: Arc<AtomicBool>,
}

impl<W> FaultyWriter<W> {
    fn check(&self) -> io::Result<()> {
        if self.fault.load(Ordering::SeqCst) {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure"))
        } else {
            Ok(())
        }
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for FaultyWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Err(e) = this.check() {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Err(e) = this.check() {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

// =============================================================================
// Mock Panel
// =============================================================================

/// Panel side of one mock channel.
#[derive(Debug)]
pub struct MockPanel {
    index: u64,
    stream: DuplexStream,
    decoder: FrameDecoder,
    received: VecDeque<(String, Instant)>,
    write_fault: Arc<AtomicBool>,
}

impl MockPanel {
    fn new(index: u64, stream: DuplexStream, write_fault: Arc<AtomicBool>) -> Self {
        Self {
            index,
            stream,
            decoder: FrameDecoder::new(),
            received: VecDeque::new(),
            write_fault,
        }
    }

    /// One-based number of the `open` call that produced this channel.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Reads the next request, or `None` once the bridge closed the channel.
    pub async fn next_request(&mut self) -> Option<String> {
        self.next_request_timed().await.map(|(text, _)| text)
    }

    /// Like [`next_request`](Self::next_request), with the clock reading at
    /// which the request arrived.
    pub async fn next_request_timed(&mut self) -> Option<(String, Instant)> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(request) = self.received.pop_front() {
                return Some(request);
            }
            let n = match self.stream.read(&mut buf).await {
                Ok(0) | Err(_) => return None,
                Ok(n) => n,
            };
            let now = Instant::now();
            for frame in self.decoder.push(&buf[..n]) {
                self.received.push_back((frame.into_string(), now));
            }
        }
    }

    /// Reads up to `count` requests, giving up after `timeout`.
    pub async fn collect_requests(&mut self, count: usize, timeout: Duration) -> Vec<String> {
        let mut requests = Vec::with_capacity(count);
        let _ = tokio::time::timeout(timeout, async {
            while requests.len() < count {
                match self.next_request().await {
                    Some(request) => requests.push(request),
                    None => break,
                }
            }
        })
        .await;
        requests
    }

    /// Waits for a request, returning `None` if none arrives within `timeout`.
    pub async fn request_within(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::timeout(timeout, self.next_request())
            .await
            .ok()
            .flatten()
    }

    /// Sends one CR-terminated line to the bridge.
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\r');
        self.send_raw(&bytes).await
    }

    /// Sends raw bytes to the bridge.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Makes every subsequent write of the bridge fail.
    pub fn break_bridge_writes(&self) {
        self.write_fault.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if the bridge closes the channel within `timeout`.
    /// Requests arriving meanwhile are discarded.
    pub async fn closed_within(&mut self, timeout: Duration) -> bool {
        let mut buf = [0u8; 256];
        let drained = tokio::time::timeout(timeout, async {
            loop {
                match self.stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {}
                }
            }
        })
        .await;
        drained.is_ok()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Records every message it sees.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    messages: Mutex<Vec<ClassifiedMessage>>,
}

impl RecordingHandler {
    /// Creates a recorder.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// All recorded messages, in delivery order.
    pub fn messages(&self) -> Vec<ClassifiedMessage> {
        self.messages.lock().clone()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Recorded events.
    pub fn events(&self) -> Vec<PanelEvent> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                ClassifiedMessage::Event(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Recorded responses.
    pub fn responses(&self) -> Vec<PanelResponse> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                ClassifiedMessage::Response(response) => Some(response.clone()),
                _ => None,
            })
            .collect()
    }

    /// Recorded link status messages.
    pub fn statuses(&self) -> Vec<LinkStatus> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                ClassifiedMessage::Status(status) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl MessageHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_message(&self, message: &ClassifiedMessage) -> Result<(), HandlerError> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

/// Rejects every message.
#[derive(Debug, Default)]
pub struct FailingHandler {
    calls: AtomicU64,
}

impl FailingHandler {
    /// Creates the handler.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of invocations.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MessageHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    fn on_message(&self, _message: &ClassifiedMessage) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::new("rejected by test handler"))
    }
}

/// Panics on every message.
#[derive(Debug, Default)]
pub struct PanickingHandler {
    calls: AtomicU64,
}

impl PanickingHandler {
    /// Creates the handler.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of invocations.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MessageHandler for PanickingHandler {
    fn name(&self) -> &str {
        "panicking"
    }

    fn on_message(&self, message: &ClassifiedMessage) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("test handler panicked on {:?}", message.kind());
    }
}

// =============================================================================
// Tests
// =============================================================================
