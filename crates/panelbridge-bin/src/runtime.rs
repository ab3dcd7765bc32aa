// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime orchestration.
//!
//! The runtime wires the configured serial port into a [`Supervisor`], logs
//! every classified message, and optionally:
//!
//! - forwards stdin lines to the panel as requests,
//! - prints a JSON health snapshot at a fixed interval.
//!
//! It runs until a shutdown signal arrives and then stops the link.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use panelbridge_config::{BridgeConfig, ConfigLoader};
use panelbridge_core::{
    ClassifiedMessage, HandlerError, LinkError, LinkStatus, MessageHandler, PanelResponse,
};
use panelbridge_serial::{ChannelFactory, SerialChannelFactory, Supervisor};

use crate::error::{BinError, BinResult};
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal};

// =============================================================================
// BridgeRuntime
// =============================================================================

/// Runs one panel link until shutdown.
pub struct BridgeRuntime {
    config: BridgeConfig,
    shutdown: ShutdownCoordinator,
    forward_stdin: bool,
    status_interval: Option<Duration>,
}

impl BridgeRuntime {
    /// Creates a runtime for a validated configuration.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
            forward_stdin: false,
            status_interval: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns a handle to the shutdown coordinator.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs against the configured serial port.
    pub async fn run(self) -> BinResult<()> {
        let factory = Arc::new(SerialChannelFactory::new(self.config.serial.clone()));
        self.run_with_factory(factory).await
    }

    /// Runs against any channel factory.
    pub async fn run_with_factory(self, factory: Arc<dyn ChannelFactory>) -> BinResult<()> {
        info!(
            version = panelbridge_core::VERSION,
            config = %self.config.summary(),
            "Starting panel bridge"
        );

        let supervisor = Arc::new(
            Supervisor::builder(factory)
                .options(self.config.link.clone())
                .resolver(self.config.resolver.clone())
                .build()?,
        );
        supervisor.register_handler(Arc::new(PanelLogHandler));

        match supervisor.start().await {
            Ok(()) => {}
            Err(error) if error.is_configuration() => return Err(error.into()),
            Err(error) => warn!(
                error = %error,
                delay = ?self.config.link.reconnect_delay,
                "Initial connection failed, retrying in the background"
            ),
        }

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        if self.forward_stdin {
            let supervisor = Arc::clone(&supervisor);
            let signal = self.shutdown.shutdown_signal();
            tasks.push(tokio::spawn(async move {
                let forwarded = forward_lines(spawn_stdin_reader(), &supervisor, signal).await;
                info!(forwarded, "Stopped forwarding stdin");
            }));
        }
        if let Some(interval) = self.status_interval {
            let supervisor = Arc::clone(&supervisor);
            let signal = self.shutdown.shutdown_signal();
            tasks.push(tokio::spawn(report_status(supervisor, interval, signal)));
        }

        info!("Panel bridge is ready");
        self.shutdown.wait_for_shutdown().await;

        info!("Shutdown initiated, stopping panel link");
        for task in tasks {
            if tokio::time::timeout(Duration::from_secs(1), task).await.is_err() {
                debug!("Background task did not finish in time");
            }
        }
        supervisor.stop().await;

        let counters = supervisor.counters();
        info!(
            sent = counters.messages_sent,
            responses = counters.responses_received,
            events = counters.events_received,
            "Panel bridge shutdown complete"
        );
        Ok(())
    }
}

// =============================================================================
// Background Tasks
// =============================================================================

/// Reads stdin lines on a dedicated thread.
///
/// A blocking read cannot be cancelled, so the thread is detached rather
/// than joined; it ends with the process or at end of input.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            use std::io::BufRead;
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "Failed to read stdin");
                        break;
                    }
                }
            }
        });
    if let Err(error) = spawned {
        warn!(error = %error, "Failed to start stdin reader");
    }
    rx
}

/// Queues every non-empty line as a request until the input ends or
/// shutdown starts. Returns the number of queued requests.
pub async fn forward_lines(
    mut lines: mpsc::Receiver<String>,
    supervisor: &Supervisor,
    shutdown: ShutdownSignal,
) -> usize {
    let mut forwarded = 0;
    let shutdown = shutdown.wait();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            break;
        };

        let payload = line.trim();
        if payload.is_empty() {
            continue;
        }

        match supervisor.send(payload) {
            Ok(()) => forwarded += 1,
            Err(error @ LinkError::QueueFull { .. }) => {
                warn!(error = %error, request = payload, "Request dropped");
            }
            Err(error) => warn!(error = %error, request = payload, "Invalid request"),
        }
    }

    forwarded
}

/// Prints the link health as one JSON line per interval.
pub async fn report_status(supervisor: Arc<Supervisor>, every: Duration, shutdown: ShutdownSignal) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = shutdown.wait();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let health = supervisor.health();
        match serde_json::to_string(&health) {
            Ok(line) => println!("{line}"),
            Err(error) => warn!(error = %error, "Failed to serialize health"),
        }
    }
}

// =============================================================================
// PanelLogHandler
// =============================================================================

/// Logs every message delivered by the link.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanelLogHandler;

impl MessageHandler for PanelLogHandler {
    fn name(&self) -> &str {
        "log"
    }

    fn on_message(&self, message: &ClassifiedMessage) -> Result<(), HandlerError> {
        match message {
            ClassifiedMessage::Event(event) => {
                info!(code = %event.code, args = ?event.args, "Panel event");
            }
            ClassifiedMessage::Response(PanelResponse::Error { raw, .. }) => {
                warn!(frame = %raw, "Panel rejected request");
            }
            ClassifiedMessage::Response(PanelResponse::Unknown { raw }) => {
                debug!(frame = %raw, "Unrecognized panel frame");
            }
            ClassifiedMessage::Response(response) => {
                debug!(frame = %response.raw(), "Panel response");
            }
            ClassifiedMessage::Status(LinkStatus::Failure { error_type, reason }) => {
                warn!(error_type = %error_type, reason = %reason, "Panel link failure");
            }
            ClassifiedMessage::Status(status) => info!(status = %status, "Panel link status"),
        }
        Ok(())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`BridgeRuntime`].
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<BridgeConfig>,
    port: Option<String>,
    baud_rate: Option<u32>,
    forward_stdin: bool,
    status_interval: Option<Duration>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the serial port.
    pub fn port(mut self, port: Option<String>) -> Self {
        self.port = port;
        self
    }

    /// Overrides the baud rate.
    pub fn baud_rate(mut self, baud_rate: Option<u32>) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Forwards stdin lines as requests.
    pub fn forward_stdin(mut self, enabled: bool) -> Self {
        self.forward_stdin = enabled;
        self
    }

    /// Prints health snapshots at this interval.
    pub fn status_interval(mut self, interval: Option<Duration>) -> Self {
        self.status_interval = interval;
        self
    }

    /// Loads the configuration, applies overrides, validates and builds.
    ///
    /// Without a file the defaults plus `PANELBRIDGE_*` overrides are used.
    pub fn build(self) -> BinResult<BridgeRuntime> {
        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, path) => {
                let loader = ConfigLoader::new().with_validation(false);
                match path {
                    Some(path) => loader.load(&path).map_err(|e| {
                        BinError::from(e).with_context(format!(
                            "Failed to load config from {}",
                            path.display()
                        ))
                    })?,
                    None => loader.load_defaults()?,
                }
            }
        };

        if let Some(port) = self.port {
            config.serial.port = port;
        }
        if let Some(baud_rate) = self.baud_rate {
            config.serial.baud_rate = baud_rate;
        }
        config.validate()?;

        if matches!(self.status_interval, Some(interval) if interval.is_zero()) {
            return Err(BinError::usage("status interval must be greater than zero"));
        }

        Ok(BridgeRuntime {
            config,
            shutdown: ShutdownCoordinator::new(),
            forward_stdin: self.forward_stdin,
            status_interval: self.status_interval,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use panelbridge_core::LinkResult;
    use panelbridge_serial::{Channel, LinkOptions, SerialSettings};
    use std::io::Write;

    /// A factory whose port never exists.
    struct MissingPort;

    #[async_trait]
    impl ChannelFactory for MissingPort {
        async fn open(&self) -> LinkResult<Channel> {
            Err(LinkError::port_not_found("/dev/missing"))
        }

        fn describe(&self) -> String {
            "/dev/missing".to_string()
        }
    }

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            serial: SerialSettings::new("/dev/ttyUSB0"),
            ..Default::default()
        }
    }

    #[test]
    fn test_runtime_builder_with_config() {
        let runtime = RuntimeBuilder::new()
            .config(test_config())
            .baud_rate(Some(19200))
            .build()
            .unwrap();

        assert_eq!(runtime.config().serial.baud_rate, 19200);
    }

    #[test]
    fn test_runtime_builder_port_override_satisfies_validation() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(b"[link]\nsend_spacing = \"200ms\"\n").unwrap();

        let result = RuntimeBuilder::new().config_path(file.path()).build();
        assert!(result.is_err());

        let runtime = RuntimeBuilder::new()
            .config_path(file.path())
            .port(Some("/dev/ttyS0".to_string()))
            .build()
            .unwrap();
        assert_eq!(runtime.config().serial.port, "/dev/ttyS0");
        assert_eq!(runtime.config().link.send_spacing, Duration::from_millis(200));
    }

    #[test]
    fn test_runtime_builder_rejects_zero_status_interval() {
        let result = RuntimeBuilder::new()
            .config(test_config())
            .status_interval(Some(Duration::ZERO))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_configuration_error_ends_run() {
        let runtime = BridgeRuntime::new(test_config());
        let error = runtime
            .run_with_factory(Arc::new(MissingPort))
            .await
            .unwrap_err();
        assert_eq!(error.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_forward_lines_queues_trimmed_requests() {
        let supervisor = Supervisor::new(Arc::new(MissingPort), LinkOptions::default()).unwrap();
        let (tx, rx) = mpsc::channel(8);
        for line in ["ZS 1", "", "  AR 1 1234  \r", "ARM é"] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);

        let forwarded =
            forward_lines(rx, &supervisor, ShutdownCoordinator::new().shutdown_signal()).await;

        assert_eq!(forwarded, 2);
        assert_eq!(supervisor.pending_requests(), 2);
    }

    #[tokio::test]
    async fn test_forward_lines_stops_on_shutdown() {
        let supervisor = Supervisor::new(Arc::new(MissingPort), LinkOptions::default()).unwrap();
        let coordinator = ShutdownCoordinator::new();
        let (_tx, rx) = mpsc::channel::<String>(8);
        coordinator.initiate_shutdown();

        let forwarded = forward_lines(rx, &supervisor, coordinator.shutdown_signal()).await;
        assert_eq!(forwarded, 0);
    }

    #[test]
    fn test_log_handler_never_fails() {
        let handler = PanelLogHandler;
        let message = ClassifiedMessage::Status(LinkStatus::Offline);
        assert!(handler.on_message(&message).is_ok());
        assert_eq!(handler.name(), "log");
    }
}
