//! Seams between the relay and the hardware.
//!
//! Both traits return `impl Future + Send` so that implementations can be
//! driven from spawned tokio tasks. Like the rest of the crate they rely on
//! return-position `impl Trait` in traits and are not object-safe; use
//! generics or the enum wrappers in [`devices`](crate::devices).

use std::future::Future;

use edgepulse_core::EndpointCandidate;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ActuationError, OpenError};

/// Opens candidate endpoints as async byte streams.
///
/// # Examples
///
/// ```no_run
/// use edgepulse_core::EndpointCandidate;
/// use edgepulse_hardware::traits::PortOpener;
/// use edgepulse_hardware::SerialPortOpener;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let opener = SerialPortOpener::new();
/// let candidate = EndpointCandidate::new("/dev/ttyACM0", 115_200)?;
/// let _stream = opener.open(&candidate).await?;
/// # Ok(())
/// # }
/// ```
pub trait PortOpener: Send + Sync {
    /// Stream type produced by a successful open.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open `candidate` at its baud rate.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::Claimed`] when another process holds the endpoint
    /// and [`OpenError::Unavailable`] for every other failure.
    fn open(
        &self,
        candidate: &EndpointCandidate,
    ) -> impl Future<Output = Result<Self::Stream, OpenError>> + Send;
}

/// Something that produces one physical actuation per call.
///
/// The relay pipeline only knows this trait, which keeps it testable without
/// a board attached.
pub trait Actuate: Send + Sync {
    /// Perform one actuation (one or more pulses, as configured).
    fn actuate(&self) -> impl Future<Output = Result<(), ActuationError>> + Send;
}
