//! Hardware layer of the edgepulse bridge.
//!
//! Finds a Firmata board among a list of candidate endpoints and drives an
//! actuator pin on it.
//!
//! # Lifecycle
//!
//! ```text
//! [EndpointCandidate] ──DeviceConnector::connect──> DeviceHandle
//!                                                       │
//!                                        ActuatorController::new
//!                                                       │
//!                        configure(pin) ──> ActuatorPin ──> pulse / release
//!                                                       │
//!                                                  shutdown()
//! ```
//!
//! - [`PortOpener`] opens endpoints: [`SerialPortOpener`] for real ports,
//!   [`mock::MockPortOpener`] for scripted ones.
//! - [`DeviceConnector`] tries candidates strictly in order and stops at the
//!   first board that answers the handshake.
//! - [`ActuatorController`] serialises access to the board; a pulse holds it
//!   for one full high/low cycle.
//! - [`Buzzer`] implements [`Actuate`], the seam the relay pipeline uses.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use edgepulse_core::endpoint;
//! use edgepulse_hardware::mock::MockPortOpener;
//! use edgepulse_hardware::{ActuatorController, Buzzer, DeviceConnector, PulseTiming};
//! use edgepulse_hardware::traits::Actuate;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let candidates = endpoint::enumerate("/dev/ttyS1,/dev/ttyS2", 115_200);
//! let connector = DeviceConnector::new(MockPortOpener::simulated(&candidates));
//! let device = connector.connect(&candidates).await?;
//!
//! let controller = Arc::new(ActuatorController::new(device));
//! let pin = controller.configure(6).await?;
//! let buzzer = Buzzer::new(Arc::clone(&controller), pin)
//!     .with_timing(PulseTiming::from_millis(10, 10));
//! buzzer.actuate().await?;
//!
//! controller.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod actuator;
pub mod connector;
pub mod device;
pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

pub use actuator::{ActuatorController, Buzzer};
pub use connector::DeviceConnector;
pub use device::DeviceHandle;
pub use devices::AnyPortOpener;
pub use error::{
    ActuationError, ConfigError, ConnectionError, DeviceError, HandshakeError, OpenError,
};
pub use serial::SerialPortOpener;
pub use traits::{Actuate, PortOpener};
pub use types::{ActuatorPin, DeviceInfo, PulseTiming};
