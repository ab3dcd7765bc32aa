// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection supervisor.
//!
//! The [`Supervisor`] owns the channel lifecycle and the link state machine.
//! A *session* is one successful open plus its two worker tasks; each session
//! gets a generation number so errors from a torn-down session are ignored.
//!
//! ```text
//!          start()
//!             │
//!             ▼            open ok           worker error / stall
//!        Connecting ─────────────────▶ Connected ─────────────────▶ IoError | Stalled
//!          │    ▲                                                        │
//! config   │    │ delay elapsed                      cancel session,     │
//! error    ▼    └──────────────── ReconnectScheduled ◀── spawn one ──────┘
//!  ConfigurationError                     ▲              reconnect task
//!                                         │
//!                         further errors are merged here
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use panelbridge_serial::{LinkOptions, SerialChannelFactory, SerialSettings, Supervisor};
//!
//! let factory = Arc::new(SerialChannelFactory::new(SerialSettings::new("/dev/ttyUSB0")));
//! let supervisor = Supervisor::new(factory, LinkOptions::default())?;
//! supervisor.register_handler(Arc::new(MyHandler));
//! supervisor.start().await?;
//! supervisor.send("ZS 1")?;
//! // ...
//! supervisor.stop().await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use panelbridge_core::{
    ClassifiedMessage, Dispatcher, HandlerId, LinkCounters, LinkCountersSnapshot, LinkError,
    LinkHealth, LinkResult, LinkState, LinkStatus, MessageHandler, Request, RequestQueue,
    ResolverOptions, ResponseResolver,
};

use crate::channel::{ChannelFactory, ChannelReader, ChannelWriter};
use crate::receiver::{ReceiverContext, run_receiver};
use crate::sender::{SenderContext, run_sender};
use crate::types::LinkOptions;

// =============================================================================
// Supervisor
// =============================================================================

/// Owner-facing handle of the panel link.
///
/// Dropping the supervisor cancels its workers and any pending reconnection;
/// call [`stop`](Self::stop) to also wait for them.
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Creates a supervisor with default resolver options.
    pub fn new(factory: Arc<dyn ChannelFactory>, options: LinkOptions) -> LinkResult<Self> {
        Self::builder(factory).options(options).build()
    }

    /// Creates a builder.
    pub fn builder(factory: Arc<dyn ChannelFactory>) -> SupervisorBuilder {
        SupervisorBuilder::new(factory)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens the channel and starts the workers.
    ///
    /// Returns the open error, if any. A configuration-class error leaves the
    /// link in [`LinkState::ConfigurationError`] and is not retried; a
    /// communication-class error schedules a reconnection before returning.
    /// Calling `start` on a running link does nothing.
    pub async fn start(&self) -> LinkResult<()> {
        let epoch = {
            let mut control = self.inner.control.lock();
            if control.running {
                tracing::debug!("Link already running");
                return Ok(());
            }
            control.running = true;
            control.epoch += 1;
            control.last_error = None;
            control.epoch
        };
        self.inner.reconnect_attempts.store(0, Ordering::Relaxed);

        tracing::info!(channel = %self.inner.factory.describe(), "Starting panel link");

        match self.inner.connect(epoch).await {
            Ok(()) => Ok(()),
            Err(LinkError::Shutdown) => Err(LinkError::Shutdown),
            Err(error) if error.is_configuration() => {
                {
                    let mut control = self.inner.control.lock();
                    if control.epoch == epoch {
                        control.running = false;
                        control.state = LinkState::ConfigurationError;
                        control.last_error = Some(error.clone());
                    }
                }
                tracing::error!(
                    error = %error,
                    error_type = error.error_type(),
                    "Cannot open panel link"
                );
                Err(error)
            }
            Err(error) => {
                self.inner.on_open_failure(epoch, error.clone());
                Err(error)
            }
        }
    }

    /// Stops the workers, cancels any pending reconnection and closes the
    /// channel. Safe to call any number of times.
    pub async fn stop(&self) {
        let (sessions, reconnect, was_active) = {
            let mut control = self.inner.control.lock();
            let was_active = control.running || control.session.is_some();
            control.running = false;
            let mut sessions: Vec<Session> = control.retired.drain(..).collect();
            sessions.extend(control.session.take());
            (sessions, control.reconnect.take(), was_active)
        };

        if let Some(handle) = reconnect {
            handle.abort();
        }
        for session in &sessions {
            session.cancel.cancel();
        }
        for session in sessions {
            session.shutdown(self.inner.options.shutdown_timeout).await;
        }

        {
            let mut control = self.inner.control.lock();
            if !control.running {
                control.state = LinkState::Disconnected;
                control.connected_since = None;
            }
        }

        if was_active {
            tracing::info!(channel = %self.inner.factory.describe(), "Panel link stopped");
            self.inner
                .dispatcher
                .dispatch(&ClassifiedMessage::Status(LinkStatus::Offline));
        }
    }

    /// Reports a communication failure detected outside the workers.
    ///
    /// Tears down the current session and schedules one reconnection. While
    /// a reconnection is already pending the error is only recorded.
    pub fn on_communication_error(&self, error: LinkError) {
        self.inner.on_communication_error(None, error);
    }

    // =========================================================================
    // Requests and handlers
    // =========================================================================

    /// Queues a request. Never blocks.
    ///
    /// Fails only with [`LinkError::QueueFull`] when a bound is configured.
    /// Requests queued while the link is down are sent once it recovers.
    pub fn send_request(&self, request: Request) -> LinkResult<()> {
        self.inner.queue.push(request)
    }

    /// Builds and queues a request from a payload.
    pub fn send(&self, payload: impl Into<String>) -> LinkResult<()> {
        self.send_request(Request::new(payload)?)
    }

    /// Registers a message handler.
    pub fn register_handler(&self, handler: Arc<dyn MessageHandler>) -> HandlerId {
        self.inner.dispatcher.register(handler)
    }

    /// Unregisters a handler by id.
    pub fn unregister_handler(&self, id: HandlerId) -> bool {
        self.inner.dispatcher.unregister(id)
    }

    /// Unregisters every handler named `name`.
    pub fn unregister_handler_named(&self, name: &str) -> usize {
        self.inner.dispatcher.unregister_named(name)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.inner.control.lock().state
    }

    /// Returns `true` while the link is connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns `true` between `start` and `stop`, including while recovering.
    pub fn is_running(&self) -> bool {
        self.inner.control.lock().running
    }

    /// Counters of the current connection.
    pub fn counters(&self) -> LinkCountersSnapshot {
        self.inner.counters.snapshot()
    }

    /// Requests waiting to be written.
    pub fn pending_requests(&self) -> usize {
        self.inner.queue.len()
    }

    /// Full health report.
    pub fn health(&self) -> LinkHealth {
        let channel = self.inner.factory.describe();
        let (state, last_error, connected_since) = {
            let control = self.inner.control.lock();
            (
                control.state,
                control.last_error.clone(),
                control.connected_since,
            )
        };

        LinkHealth {
            state,
            status: state.status(),
            channel,
            last_error_type: last_error.as_ref().map(|e| e.error_type().to_string()),
            last_error: last_error.as_ref().map(|e| e.to_string()),
            reconnect_attempts: self.inner.reconnect_attempts.load(Ordering::Relaxed),
            pending_requests: self.inner.queue.len(),
            connected_since,
            counters: self.inner.counters.snapshot(),
        }
    }

    /// Link options in use.
    pub fn options(&self) -> &LinkOptions {
        &self.inner.options
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        let mut control = self.inner.control.lock();
        control.running = false;
        if let Some(handle) = control.reconnect.take() {
            handle.abort();
        }
        for session in control.session.iter().chain(control.retired.iter()) {
            session.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("channel", &self.inner.factory.describe())
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// SupervisorBuilder
// =============================================================================

/// Builder for [`Supervisor`].
pub struct SupervisorBuilder {
    factory: Arc<dyn ChannelFactory>,
    options: LinkOptions,
    resolver: ResolverOptions,
}

impl SupervisorBuilder {
    /// Creates a builder around a channel factory.
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            factory,
            options: LinkOptions::default(),
            resolver: ResolverOptions::default(),
        }
    }

    /// Sets the link options.
    pub fn options(mut self, options: LinkOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the resolver options.
    pub fn resolver(mut self, resolver: ResolverOptions) -> Self {
        self.resolver = resolver;
        self
    }

    /// Validates the options and builds the supervisor.
    pub fn build(self) -> LinkResult<Supervisor> {
        self.options.validate()?;
        self.resolver
            .validate()
            .map_err(|message| LinkError::invalid_settings("resolver", message))?;

        let counters = Arc::new(LinkCounters::new());
        let inner = Inner {
            factory: self.factory,
            queue: Arc::new(RequestQueue::new(self.options.max_pending)),
            resolver: Arc::new(ResponseResolver::new(self.resolver)),
            dispatcher: Arc::new(Dispatcher::new(Arc::clone(&counters))),
            counters,
            options: self.options,
            control: Mutex::new(Control::default()),
            reconnect_attempts: AtomicU64::new(0),
        };

        Ok(Supervisor {
            inner: Arc::new(inner),
        })
    }
}

// =============================================================================
// Internals
// =============================================================================

struct Inner {
    factory: Arc<dyn ChannelFactory>,
    options: LinkOptions,
    resolver: Arc<ResponseResolver>,
    queue: Arc<RequestQueue>,
    counters: Arc<LinkCounters>,
    dispatcher: Arc<Dispatcher>,
    control: Mutex<Control>,
    reconnect_attempts: AtomicU64,
}

/// Mutable lifecycle state. Every transition happens under this lock.
#[derive(Default)]
struct Control {
    running: bool,
    /// Incremented by every `start`; stale reconnect tasks compare against it.
    epoch: u64,
    generation: u64,
    state: LinkState,
    session: Option<Session>,
    /// Cancelled sessions not yet joined.
    retired: Vec<Session>,
    reconnect: Option<JoinHandle<()>>,
    last_error: Option<LinkError>,
    connected_since: Option<DateTime<Utc>>,
}

struct Session {
    generation: u64,
    cancel: CancellationToken,
    sender: JoinHandle<()>,
    receiver: JoinHandle<()>,
}

impl Session {
    /// Cancels the workers and waits up to `timeout` for them, aborting
    /// whatever is still running afterwards.
    async fn shutdown(self, timeout: Duration) {
        self.cancel.cancel();

        let Session {
            generation,
            sender,
            receiver,
            ..
        } = self;
        let sender_abort = sender.abort_handle();
        let receiver_abort = receiver.abort_handle();

        let joined = tokio::time::timeout(timeout, async {
            let _ = sender.await;
            let _ = receiver.await;
        })
        .await;

        if joined.is_err() {
            tracing::warn!(
                generation,
                timeout = ?timeout,
                "Workers did not stop in time, aborting"
            );
            sender_abort.abort();
            receiver_abort.abort();
        }
    }
}

impl Inner {
    /// Opens a channel and installs a new session.
    async fn connect(self: &Arc<Self>, epoch: u64) -> LinkResult<()> {
        {
            let mut control = self.control.lock();
            if !control.running || control.epoch != epoch {
                return Err(LinkError::Shutdown);
            }
            control.state = LinkState::Connecting;
        }

        let channel = self.factory.open().await?;
        let description = channel.description().to_string();
        let (reader, writer) = channel.into_split();

        let generation = {
            let mut control = self.control.lock();
            if !control.running || control.epoch != epoch {
                // Dropping the halves closes the channel.
                return Err(LinkError::Shutdown);
            }

            control.generation += 1;
            let generation = control.generation;
            self.counters.reset();

            let cancel = CancellationToken::new();
            let sender = self.spawn_sender(generation, writer, cancel.clone());
            let receiver = self.spawn_receiver(generation, reader, cancel.clone());

            control.session = Some(Session {
                generation,
                cancel,
                sender,
                receiver,
            });
            control.state = LinkState::Connected;
            control.connected_since = Some(Utc::now());
            control.reconnect = None;
            generation
        };

        tracing::info!(
            channel = %description,
            generation,
            pending = self.queue.len(),
            "Panel link connected"
        );
        self.dispatcher
            .dispatch(&ClassifiedMessage::Status(LinkStatus::Online));
        Ok(())
    }

    fn spawn_sender(
        self: &Arc<Self>,
        generation: u64,
        writer: ChannelWriter,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let ctx = SenderContext {
            queue: Arc::clone(&self.queue),
            counters: Arc::clone(&self.counters),
            spacing: self.options.send_spacing,
            write_timeout: self.options.write_timeout,
            cancel,
        };
        let inner = Arc::clone(self);

        tokio::spawn(
            async move {
                if let Err(error) = run_sender(writer, ctx).await {
                    inner.on_communication_error(Some(generation), error);
                }
            }
            .instrument(tracing::info_span!("sender", generation)),
        )
    }

    fn spawn_receiver(
        self: &Arc<Self>,
        generation: u64,
        reader: ChannelReader,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let ctx = ReceiverContext {
            resolver: Arc::clone(&self.resolver),
            dispatcher: Arc::clone(&self.dispatcher),
            counters: Arc::clone(&self.counters),
            stall_threshold: self.options.stall_threshold,
            read_timeout: self.options.read_timeout,
            max_frame_len: self.options.max_frame_len,
            cancel,
        };
        let inner = Arc::clone(self);

        tokio::spawn(
            async move {
                if let Err(error) = run_receiver(reader, ctx).await {
                    inner.on_communication_error(Some(generation), error);
                }
            }
            .instrument(tracing::info_span!("receiver", generation)),
        )
    }

    /// Handles an error from a running session.
    ///
    /// `generation` is `None` for errors reported by the owner, which always
    /// refer to the current session.
    fn on_communication_error(self: &Arc<Self>, generation: Option<u64>, error: LinkError) {
        {
            let mut control = self.control.lock();
            if !control.running {
                tracing::debug!(error = %error, "Ignoring error while stopped");
                return;
            }
            if control.reconnect.is_some() {
                // `last_error` keeps the cause that scheduled the reconnection.
                tracing::debug!(error = %error, "Reconnection already scheduled, merging error");
                return;
            }
            let current = control.session.as_ref().map(|s| s.generation);
            if current.is_none() || (generation.is_some() && generation != current) {
                tracing::debug!(
                    error = %error,
                    generation = ?generation,
                    "Ignoring error from retired session"
                );
                return;
            }

            control.state = if error.is_stall() {
                LinkState::Stalled
            } else {
                LinkState::IoError
            };
            control.last_error = Some(error.clone());
            control.connected_since = None;
            if let Some(session) = control.session.take() {
                session.cancel.cancel();
                control.retired.push(session);
            }
            let epoch = control.epoch;
            control.reconnect = Some(self.spawn_reconnect(epoch));
        }

        tracing::warn!(
            error = %error,
            error_type = error.error_type(),
            delay = ?self.options.reconnect_delay,
            "Communication error, reconnection scheduled"
        );
        self.dispatcher
            .dispatch(&ClassifiedMessage::Status(LinkStatus::Failure {
                error_type: error.error_type().to_string(),
                reason: error.to_string(),
            }));
    }

    /// Handles a failed open during `start` or a reconnection attempt.
    fn on_open_failure(self: &Arc<Self>, epoch: u64, error: LinkError) {
        {
            let mut control = self.control.lock();
            if !control.running || control.epoch != epoch {
                return;
            }
            control.state = LinkState::IoError;
            control.last_error = Some(error.clone());
            // Replaces the handle of the attempt that just failed, if any.
            control.reconnect = Some(self.spawn_reconnect(epoch));
        }

        tracing::warn!(
            error = %error,
            error_type = error.error_type(),
            delay = ?self.options.reconnect_delay,
            "Failed to open panel link, reconnection scheduled"
        );
        self.dispatcher
            .dispatch(&ClassifiedMessage::Status(LinkStatus::Failure {
                error_type: error.error_type().to_string(),
                reason: error.to_string(),
            }));
    }

    fn spawn_reconnect(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(
            async move { inner.reconnect_after_delay(epoch).await }
                .instrument(tracing::info_span!("reconnect")),
        )
    }

    async fn reconnect_after_delay(self: Arc<Self>, epoch: u64) {
        {
            let mut control = self.control.lock();
            if !control.running || control.epoch != epoch {
                return;
            }
            control.state = LinkState::ReconnectScheduled;
        }

        tokio::time::sleep(self.options.reconnect_delay).await;

        let retired = std::mem::take(&mut self.control.lock().retired);
        for session in retired {
            session.shutdown(self.options.shutdown_timeout).await;
        }

        let attempt = self.reconnect_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            attempt,
            channel = %self.factory.describe(),
            "Attempting reconnection"
        );

        match self.connect(epoch).await {
            Ok(()) => tracing::info!(attempt, "Reconnected"),
            Err(LinkError::Shutdown) => {}
            Err(error) => self.on_open_failure(epoch, error),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use async_trait::async_trait;
    use parking_lot::Mutex as PlMutex;
    use std::collections::VecDeque;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::mpsc;

    /// Hands out duplex channels and passes the far ends to the test.
    struct DuplexFactory {
        opens: AtomicU64,
        failures: PlMutex<VecDeque<LinkError>>,
        remotes: mpsc::UnboundedSender<DuplexStream>,
    }

    impl DuplexFactory {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let factory = Arc::new(Self {
                opens: AtomicU64::new(0),
                failures: PlMutex::new(VecDeque::new()),
                remotes: tx,
            });
            (factory, rx)
        }

        fn fail_next(&self, error: LinkError) {
            self.failures.lock().push_back(error);
        }

        fn opens(&self) -> u64 {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChannelFactory for DuplexFactory {
        async fn open(&self) -> LinkResult<Channel> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.failures.lock().pop_front() {
                return Err(error);
            }
            let (local, remote) = tokio::io::duplex(1024);
            let _ = self.remotes.send(remote);
            Ok(Channel::from_stream("duplex", local))
        }

        fn describe(&self) -> String {
            "duplex".to_string()
        }
    }

    fn options() -> LinkOptions {
        LinkOptions::default()
            .with_send_spacing(Duration::from_millis(10))
            .with_reconnect_delay(Duration::from_secs(60))
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_connects_and_stop_disconnects() {
        let (factory, mut remotes) = DuplexFactory::new();
        let supervisor = Supervisor::new(factory.clone(), options()).unwrap();
        assert_eq!(supervisor.state(), LinkState::Disconnected);

        supervisor.start().await.unwrap();
        assert_eq!(supervisor.state(), LinkState::Connected);
        let mut remote = remotes.recv().await.unwrap();

        supervisor.send("ZS 1").unwrap();
        let mut buf = [0u8; 5];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ZS 1\r");

        supervisor.stop().await;
        assert_eq!(supervisor.state(), LinkState::Disconnected);
        assert_eq!(remote.read(&mut buf).await.unwrap(), 0);

        supervisor.stop().await;
        assert_eq!(supervisor.state(), LinkState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configuration_error_is_not_retried() {
        let (factory, _remotes) = DuplexFactory::new();
        factory.fail_next(LinkError::port_busy("duplex"));
        let supervisor = Supervisor::new(factory.clone(), options()).unwrap();

        let error = supervisor.start().await.unwrap_err();
        assert!(error.is_configuration());
        assert_eq!(supervisor.state(), LinkState::ConfigurationError);
        assert!(!supervisor.is_running());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(factory.opens(), 1);
        assert_eq!(
            supervisor.health().last_error_type.as_deref(),
            Some("port_busy")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_communication_open_error_schedules_reconnect() {
        let (factory, mut remotes) = DuplexFactory::new();
        factory.fail_next(LinkError::open_failed("duplex", "not ready"));
        let supervisor = Supervisor::new(factory.clone(), options()).unwrap();

        let error = supervisor.start().await.unwrap_err();
        assert!(error.is_communication());
        assert!(supervisor.is_running());
        assert!(supervisor.state().is_recovering());

        let _remote = remotes.recv().await.unwrap();
        assert_eq!(factory.opens(), 2);
        assert_eq!(supervisor.state(), LinkState::Connected);
        assert_eq!(supervisor.health().reconnect_attempts, 1);

        supervisor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_within_delay_merge_into_one_reconnect() {
        let (factory, mut remotes) = DuplexFactory::new();
        let supervisor = Supervisor::new(factory.clone(), options()).unwrap();
        supervisor.start().await.unwrap();
        let remote = remotes.recv().await.unwrap();

        drop(remote);
        settle().await;
        assert!(supervisor.state().is_recovering());

        supervisor.on_communication_error(LinkError::ConnectionClosed);
        supervisor.on_communication_error(LinkError::stalled(9, 5));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(factory.opens(), 1);

        let _remote = remotes.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(factory.opens(), 2);
        assert_eq!(supervisor.state(), LinkState::Connected);

        supervisor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let (factory, mut remotes) = DuplexFactory::new();
        let supervisor = Supervisor::new(factory.clone(), options()).unwrap();
        supervisor.start().await.unwrap();
        drop(remotes.recv().await.unwrap());
        settle().await;

        supervisor.stop().await;
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(factory.opens(), 1);
        assert_eq!(supervisor.state(), LinkState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_reset_on_reconnect() {
        let (factory, mut remotes) = DuplexFactory::new();
        let supervisor = Supervisor::new(factory.clone(), options()).unwrap();
        supervisor.start().await.unwrap();
        let mut remote = remotes.recv().await.unwrap();

        remote.write_all(b"!ZN 1\r").await.unwrap();
        while supervisor.counters().events_received == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        drop(remote);
        let _remote = remotes.recv().await.unwrap();
        assert_eq!(supervisor.counters().events_received, 0);

        supervisor.stop().await;
    }

    #[test]
    fn test_builder_rejects_invalid_options() {
        let (factory, _remotes) = DuplexFactory::new();
        let result = Supervisor::builder(factory)
            .options(LinkOptions::default().with_stall_threshold(0))
            .build();
        assert!(result.is_err());
    }
}
