// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Byte channel to the panel.
//!
//! A [`Channel`] is an opened connection split into an input half (owned by
//! the receiver) and an output half (owned by the sender). Dropping both
//! halves closes the underlying port.
//!
//! Channels are produced by a [`ChannelFactory`] injected into the
//! supervisor. [`SerialChannelFactory`] opens a real serial port through
//! `tokio-serial`; tests supply in-memory factories.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;

use panelbridge_core::{LinkError, LinkResult};

use crate::types::SerialSettings;

/// Input half of a channel.
pub type ChannelReader = Box<dyn AsyncRead + Send + Unpin>;

/// Output half of a channel.
pub type ChannelWriter = Box<dyn AsyncWrite + Send + Unpin>;

// =============================================================================
// Channel
// =============================================================================

/// An exclusively owned, opened connection.
pub struct Channel {
    description: String,
    reader: ChannelReader,
    writer: ChannelWriter,
}

impl Channel {
    /// Builds a channel from separate halves.
    pub fn new(
        description: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Builds a channel from a bidirectional stream.
    pub fn from_stream<S>(description: impl Into<String>, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(description, reader, writer)
    }

    /// Returns the channel description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Splits the channel into its halves.
    pub fn into_split(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ChannelFactory
// =============================================================================

/// Opens channels on behalf of the supervisor.
///
/// Called once on `start` and once per reconnection attempt.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Opens a new channel.
    ///
    /// Configuration-class errors (see [`LinkError::is_configuration`]) make
    /// the initial `start` fail without retry.
    async fn open(&self) -> LinkResult<Channel>;

    /// Human readable target, used in logs and health reports.
    fn describe(&self) -> String;
}

// =============================================================================
// SerialChannelFactory
// =============================================================================

/// Opens a serial port with `tokio-serial`.
#[derive(Debug, Clone)]
pub struct SerialChannelFactory {
    settings: SerialSettings,
}

impl SerialChannelFactory {
    /// Creates a factory for `settings`.
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }

    /// Returns the serial settings.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn map_open_error(&self, error: tokio_serial::Error) -> LinkError {
        let port = &self.settings.port;
        match error.kind {
            tokio_serial::ErrorKind::NoDevice => LinkError::port_not_found(port),
            tokio_serial::ErrorKind::InvalidInput => {
                LinkError::invalid_settings(port, error.description)
            }
            tokio_serial::ErrorKind::Io(io_kind) => match io_kind {
                std::io::ErrorKind::NotFound => LinkError::port_not_found(port),
                std::io::ErrorKind::PermissionDenied => LinkError::access_denied(port),
                std::io::ErrorKind::ResourceBusy => LinkError::port_busy(port),
                _ => LinkError::open_failed(port, error.description),
            },
            tokio_serial::ErrorKind::Unknown => LinkError::open_failed(port, error.description),
        }
    }
}

#[async_trait]
impl ChannelFactory for SerialChannelFactory {
    async fn open(&self) -> LinkResult<Channel> {
        self.settings.validate()?;

        let builder = tokio_serial::new(&self.settings.port, self.settings.baud_rate)
            .data_bits(self.settings.data_bits.into())
            .parity(self.settings.parity.into())
            .stop_bits(self.settings.stop_bits.into())
            .flow_control(self.settings.flow_control.into());

        #[allow(unused_mut)]
        let mut stream = builder
            .open_native_async()
            .map_err(|e| self.map_open_error(e))?;

        #[cfg(unix)]
        if self.settings.exclusive {
            stream.set_exclusive(true).map_err(|e| {
                tracing::warn!(port = %self.settings.port, error = %e, "Exclusive access refused");
                LinkError::port_busy(&self.settings.port)
            })?;
        }

        tracing::info!(
            port = %self.settings.port,
            baud_rate = self.settings.baud_rate,
            data_bits = %self.settings.data_bits,
            parity = %self.settings.parity.char(),
            stop_bits = %self.settings.stop_bits,
            "Opened serial port"
        );

        Ok(Channel::from_stream(self.settings.describe(), stream))
    }

    fn describe(&self) -> String {
        self.settings.describe()
    }
}
