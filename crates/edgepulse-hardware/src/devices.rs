//! Enum wrapper for port opener dispatch.
//!
//! [`PortOpener`] uses return-position `impl Trait` and cannot be boxed as a
//! trait object. The binary picks its opener at runtime (real serial ports or
//! `--simulate`), so it holds an [`AnyPortOpener`] instead.
//!
//! # Examples
//!
//! ```
//! use edgepulse_hardware::devices::AnyPortOpener;
//! use edgepulse_hardware::mock::MockPortOpener;
//!
//! let opener = AnyPortOpener::Mock(MockPortOpener::new());
//! assert!(opener.is_simulated());
//! ```

use edgepulse_core::EndpointCandidate;
use tokio::io::DuplexStream;

use crate::error::OpenError;
use crate::mock::MockPortOpener;
use crate::serial::SerialPortOpener;
use crate::traits::PortOpener;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyPortOpener {
    /// Real serial ports.
    Serial(SerialPortOpener),

    /// Scripted endpoints.
    Mock(MockPortOpener),
}

impl AnyPortOpener {
    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Mock(_))
    }
}

impl PortOpener for AnyPortOpener {
    type Stream = DuplexStream;

    async fn open(&self, candidate: &EndpointCandidate) -> Result<DuplexStream, OpenError> {
        match self {
            Self::Serial(opener) => opener.open(candidate).await,
            Self::Mock(opener) => opener.open(candidate).await,
        }
    }
}
