//! Serial port access through the `serialport` crate.
//!
//! `serialport` is blocking, so every opened port is bridged to an in-memory
//! duplex stream:
//!
//! ```text
//!            reader thread                 forwarder task
//! port.read ─────────────> mpsc channel ─────────────────> duplex ──> host
//! port.write <──────────── spawn_blocking <── writer task <── duplex <── host
//! ```
//!
//! Shutting down (or dropping) the host side of the duplex stops the writer
//! task, which in turn tells the reader thread to exit after its next read
//! timeout.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use edgepulse_core::EndpointCandidate;
use serialport::SerialPort;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::OpenError;
use crate::traits::PortOpener;

/// Capacity of the in-memory pipe between the bridge and the host.
const BRIDGE_BUFFER_SIZE: usize = 4096;

/// Bytes read from or written to the port per call.
const CHUNK_SIZE: usize = 256;

/// Default blocking read timeout; bounds how long the reader thread takes to
/// notice a close.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Opens real serial ports.
#[derive(Debug, Clone)]
pub struct SerialPortOpener {
    read_timeout: Duration,
}

impl SerialPortOpener {
    pub fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for SerialPortOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl PortOpener for SerialPortOpener {
    type Stream = DuplexStream;

    async fn open(&self, candidate: &EndpointCandidate) -> Result<DuplexStream, OpenError> {
        let path = candidate.path().to_string();
        let baud_rate = candidate.baud_rate();
        let read_timeout = self.read_timeout;

        debug!(endpoint = %path, baud_rate, "Opening serial port");

        let open_path = path.clone();
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(open_path, baud_rate)
                .timeout(read_timeout)
                .open()
        })
        .await
        .map_err(|e| OpenError::unavailable(&path, e.to_string()))?
        .map_err(|e| classify_open_error(&path, e))?;

        bridge(path, port)
    }
}

/// Sort an open failure into claimed or unavailable.
fn classify_open_error(endpoint: &str, error: serialport::Error) -> OpenError {
    use std::io::ErrorKind;

    let claimed = match error.kind() {
        serialport::ErrorKind::Io(ErrorKind::PermissionDenied | ErrorKind::ResourceBusy) => true,
        _ => error.description.to_ascii_lowercase().contains("busy"),
    };

    if claimed {
        OpenError::claimed(endpoint, error.description)
    } else {
        OpenError::unavailable(endpoint, error.description)
    }
}

fn bridge(endpoint: String, port: Box<dyn SerialPort>) -> Result<DuplexStream, OpenError> {
    let reader_port = port
        .try_clone()
        .map_err(|e| OpenError::unavailable(&endpoint, e.description))?;

    let (host, bridge_side) = tokio::io::duplex(BRIDGE_BUFFER_SIZE);
    let (mut from_host, mut to_host) = tokio::io::split(bridge_side);
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(32);
    let stop = Arc::new(AtomicBool::new(false));

    let reader_stop = Arc::clone(&stop);
    let reader_endpoint = endpoint.clone();
    std::thread::Builder::new()
        .name(format!("serial-reader {endpoint}"))
        .spawn(move || read_loop(&reader_endpoint, reader_port, tx, reader_stop))
        .map_err(|e| OpenError::unavailable(&endpoint, e.to_string()))?;

    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if to_host.write_all(&chunk).await.is_err() {
                break;
            }
        }
        let _ = to_host.shutdown().await;
    });

    tokio::spawn(async move {
        let mut port = port;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match from_host.read(&mut buffer).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            let chunk = buffer[..n].to_vec();
            let written = tokio::task::spawn_blocking(move || {
                let result = port.write_all(&chunk).and_then(|()| port.flush());
                (port, result)
            })
            .await;

            match written {
                Ok((returned, Ok(()))) => {
                    trace!(endpoint = %endpoint, bytes = n, "Wrote to port");
                    port = returned;
                }
                Ok((_, Err(e))) => {
                    warn!(endpoint = %endpoint, error = %e, "Serial write failed");
                    break;
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Serial writer task failed");
                    break;
                }
            }
        }

        stop.store(true, Ordering::Release);
        debug!(endpoint = %endpoint, "Serial bridge closed");
    });

    Ok(host)
}

fn read_loop(
    endpoint: &str,
    mut port: Box<dyn SerialPort>,
    tx: mpsc::Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
) {
    use std::io::ErrorKind;

    let mut buffer = [0u8; CHUNK_SIZE];
    while !stop.load(Ordering::Acquire) && !tx.is_closed() {
        match port.read(&mut buffer) {
            Ok(0) => {}
            Ok(n) => {
                if tx.blocking_send(buffer[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                warn!(endpoint, error = %e, "Serial read failed");
                break;
            }
        }
    }

    debug!(endpoint, "Serial reader stopped");
}
