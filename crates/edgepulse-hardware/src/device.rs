//! A live connection to a Firmata board.
//!
//! A [`DeviceHandle`] only exists after a successful handshake. After the
//! handshake the framed stream is split: commands go out through the sink,
//! and a background task drains whatever the board reports so its output
//! buffer never backs up. When the board side ends, the handle is marked
//! closed and every later command fails with [`DeviceError::Closed`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use edgepulse_core::constants::DEFAULT_IO_TIMEOUT_MS;
use edgepulse_firmata::{Command, FirmwareReport, HostCodec, PinMode, Report, Version};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::error::{DeviceError, HandshakeError};
use crate::types::DeviceInfo;

/// Upper bound for flushing and shutting down a stream on close.
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

type BoardFramed<S> = Framed<S, HostCodec>;

/// Exclusive handle to a board that passed the handshake.
pub struct DeviceHandle<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    info: DeviceInfo,
    sink: SplitSink<BoardFramed<S>, Command>,
    closed: Arc<AtomicBool>,
    reports: JoinHandle<()>,
    io_timeout: Duration,
}

impl<S> DeviceHandle<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Run the compatibility handshake on a freshly opened stream.
    ///
    /// Sends `REPORT_VERSION` and `REPORT_FIRMWARE` queries and waits until
    /// the board has answered both. Unrelated reports and line noise in the
    /// meantime are ignored.
    ///
    /// # Errors
    ///
    /// On timeout, protocol failure or end of stream the stream is shut down
    /// before the error is returned; nothing outlives a failed attempt.
    pub async fn handshake(
        endpoint: &str,
        stream: S,
        timeout: Duration,
    ) -> Result<Self, HandshakeError> {
        debug!(endpoint, timeout_ms = timeout.as_millis() as u64, "Starting handshake");

        let mut framed = Framed::new(stream, HostCodec::new());

        let outcome = match tokio::time::timeout(timeout, exchange(endpoint, &mut framed)).await {
            Ok(result) => result,
            Err(_) => Err(HandshakeError::Timeout {
                endpoint: endpoint.to_string(),
                duration_ms: timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok((protocol_version, firmware)) => {
                let info = DeviceInfo {
                    endpoint: endpoint.to_string(),
                    protocol_version,
                    firmware,
                };
                info!(
                    endpoint,
                    firmware = %info.firmware.name,
                    version = %info.firmware.version,
                    protocol = %info.protocol_version,
                    "Handshake completed"
                );
                Ok(Self::from_framed(info, framed))
            }
            Err(e) => {
                shutdown_framed(endpoint, framed).await;
                Err(e)
            }
        }
    }

    fn from_framed(info: DeviceInfo, framed: BoardFramed<S>) -> Self {
        let (sink, stream) = framed.split();
        let closed = Arc::new(AtomicBool::new(false));
        let reports = tokio::spawn(drain_reports(
            info.endpoint.clone(),
            stream,
            Arc::clone(&closed),
        ));

        Self {
            info,
            sink,
            closed,
            reports,
            io_timeout: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
        }
    }

    /// Override the per-command write timeout.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn endpoint(&self) -> &str {
        &self.info.endpoint
    }

    /// Whether the board side of the stream has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send `SET_PIN_MODE`.
    pub async fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), DeviceError> {
        self.send(Command::SetPinMode { pin, mode }).await
    }

    /// Send `SET_DIGITAL_PIN_VALUE`.
    pub async fn digital_write(&mut self, pin: u8, high: bool) -> Result<(), DeviceError> {
        self.send(Command::SetDigitalPinValue { pin, high }).await
    }

    async fn send(&mut self, command: Command) -> Result<(), DeviceError> {
        if self.is_closed() {
            return Err(DeviceError::Closed {
                endpoint: self.info.endpoint.clone(),
            });
        }

        trace!(endpoint = %self.info.endpoint, ?command, "Sending command");

        match tokio::time::timeout(self.io_timeout, self.sink.send(command)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(endpoint = %self.info.endpoint, error = %e, "Command failed");
                Err(DeviceError::Protocol(e))
            }
            Err(_) => {
                warn!(
                    endpoint = %self.info.endpoint,
                    "Command timeout after {}ms",
                    self.io_timeout.as_millis()
                );
                Err(DeviceError::Timeout {
                    endpoint: self.info.endpoint.clone(),
                    duration_ms: self.io_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Flush pending commands and close the stream.
    ///
    /// Flush and shutdown are each bounded so a wedged port cannot hang
    /// process exit.
    pub async fn close(mut self) {
        info!(endpoint = %self.info.endpoint, "Closing device");
        self.reports.abort();

        match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.flush()).await {
            Ok(Ok(())) => debug!("Flush completed successfully"),
            Ok(Err(e)) => warn!("Error flushing during close: {}", e),
            Err(_) => warn!("Flush timeout during close ({}ms)", CLOSE_TIMEOUT.as_millis()),
        }

        match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.close()).await {
            Ok(Ok(())) => debug!("Shutdown completed successfully"),
            Ok(Err(e)) => warn!("Error during shutdown: {}", e),
            Err(_) => warn!("Shutdown timeout during close ({}ms)", CLOSE_TIMEOUT.as_millis()),
        }

        self.closed.store(true, Ordering::Release);
    }
}

impl<S> Drop for DeviceHandle<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn drop(&mut self) {
        self.reports.abort();
    }
}

impl<S> std::fmt::Debug for DeviceHandle<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("info", &self.info)
            .field("closed", &self.is_closed())
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

/// Query version and firmware, then wait for both answers.
async fn exchange<S>(
    endpoint: &str,
    framed: &mut BoardFramed<S>,
) -> Result<(Version, FirmwareReport), HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    framed.send(Command::QueryVersion).await?;
    framed.send(Command::QueryFirmware).await?;

    let mut protocol_version = None;
    let mut firmware = None;

    loop {
        match framed.next().await {
            Some(Ok(Report::Version(version))) => {
                trace!(endpoint, %version, "Protocol version reported");
                protocol_version = Some(version);
            }
            Some(Ok(Report::Firmware(report))) => {
                trace!(endpoint, name = %report.name, "Firmware reported");
                firmware = Some(report);
            }
            Some(Ok(other)) => trace!(endpoint, report = ?other, "Ignoring report during handshake"),
            Some(Err(e)) => return Err(HandshakeError::Protocol(e)),
            None => {
                return Err(HandshakeError::Closed {
                    endpoint: endpoint.to_string(),
                });
            }
        }

        if let (Some(version), Some(report)) = (protocol_version, firmware.as_ref()) {
            return Ok((version, report.clone()));
        }
    }
}

async fn shutdown_framed<S>(endpoint: &str, framed: BoardFramed<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = framed.into_inner();
    match tokio::time::timeout(CLOSE_TIMEOUT, stream.shutdown()).await {
        Ok(Ok(())) => debug!(endpoint, "Stream closed after failed handshake"),
        Ok(Err(e)) => debug!(endpoint, error = %e, "Error closing stream after failed handshake"),
        Err(_) => warn!(endpoint, "Shutdown timeout after failed handshake"),
    }
}

async fn drain_reports<S>(
    endpoint: String,
    mut stream: SplitStream<BoardFramed<S>>,
    closed: Arc<AtomicBool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(item) = stream.next().await {
        match item {
            Ok(Report::StringData(text)) => debug!(endpoint = %endpoint, %text, "Board message"),
            Ok(report) => trace!(endpoint = %endpoint, ?report, "Board report"),
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Board stream failed");
                break;
            }
        }
    }

    closed.store(true, Ordering::Release);
    info!(endpoint = %endpoint, "Board stream ended");
}
