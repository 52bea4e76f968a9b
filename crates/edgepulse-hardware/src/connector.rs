//! Sequential discovery of a Firmata board.

use std::time::Duration;

use edgepulse_core::EndpointCandidate;
use edgepulse_core::constants::DEFAULT_HANDSHAKE_TIMEOUT_MS;
use tracing::{debug, info, warn};

use crate::device::DeviceHandle;
use crate::error::{ConnectionError, HandshakeError, OpenError};
use crate::traits::PortOpener;

/// Tries candidates one by one until a board completes the handshake.
///
/// # Examples
///
/// ```no_run
/// use edgepulse_core::endpoint;
/// use edgepulse_hardware::{DeviceConnector, SerialPortOpener};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let candidates = endpoint::enumerate("/dev/ttyS1,/dev/ttyS2", 115_200);
/// let connector = DeviceConnector::new(SerialPortOpener::new());
/// let device = connector.connect(&candidates).await?;
/// println!("Connected to {}", device.info());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeviceConnector<O> {
    opener: O,
    handshake_timeout: Duration,
}

impl<O: PortOpener> DeviceConnector<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
        }
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Return a handle to the first candidate that opens and answers the
    /// handshake. Later candidates are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NoDeviceFound`] when every candidate has
    /// been tried, including when `candidates` is empty.
    pub async fn connect(
        &self,
        candidates: &[EndpointCandidate],
    ) -> Result<DeviceHandle<O::Stream>, ConnectionError> {
        info!(candidates = candidates.len(), "Searching for a compatible device");

        for (index, candidate) in candidates.iter().enumerate() {
            debug!(attempt = index + 1, endpoint = %candidate, "Trying candidate");

            let stream = match self.opener.open(candidate).await {
                Ok(stream) => stream,
                Err(e @ OpenError::Claimed { .. }) => {
                    info!(endpoint = candidate.path(), reason = %e, "Endpoint in use, skipping");
                    continue;
                }
                Err(e) => {
                    debug!(endpoint = candidate.path(), reason = %e, "Endpoint unavailable, skipping");
                    continue;
                }
            };

            match DeviceHandle::handshake(candidate.path(), stream, self.handshake_timeout).await {
                Ok(device) => {
                    info!(device = %device.info(), "Compatible device found");
                    return Ok(device);
                }
                Err(e @ HandshakeError::Timeout { .. }) => {
                    info!(endpoint = candidate.path(), reason = %e, "No compatible device answered");
                }
                Err(e) => {
                    warn!(endpoint = candidate.path(), error = %e, "Handshake failed");
                }
            }
        }

        warn!(tried = candidates.len(), "No compatible device found");
        Err(ConnectionError::NoDeviceFound {
            tried: candidates.len(),
        })
    }
}
