//! Error types for board discovery and actuation.
//!
//! Each stage of the device lifecycle has its own error type so callers can
//! tell expected conditions (an endpoint held by another process, a port
//! with nothing Firmata-speaking behind it) from fatal ones.

use edgepulse_firmata::FirmataError;

/// Failure to open a candidate endpoint.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// Another process holds the endpoint (permission denied, exclusive lock, busy).
    #[error("Endpoint {endpoint} is claimed by another process: {reason}")]
    Claimed { endpoint: String, reason: String },

    /// The endpoint does not exist or cannot be opened for another reason.
    #[error("Endpoint {endpoint} is unavailable: {reason}")]
    Unavailable { endpoint: String, reason: String },
}

impl OpenError {
    /// Create a new claimed endpoint error.
    pub fn claimed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Claimed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unavailable endpoint error.
    pub fn unavailable(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Check if another process holds the endpoint.
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed { .. })
    }
}

/// Failure of the compatibility handshake on an opened endpoint.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// No compatible device answered in time.
    #[error("No answer from {endpoint} after {duration_ms}ms")]
    Timeout { endpoint: String, duration_ms: u64 },

    /// The stream ended before the handshake completed.
    #[error("Endpoint {endpoint} closed during handshake")]
    Closed { endpoint: String },

    #[error("Protocol error during handshake: {0}")]
    Protocol(#[from] FirmataError),
}

/// Failure to find any compatible device.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Every candidate was tried and none yielded a compatible device.
    #[error("No compatible device found ({tried} candidates tried)")]
    NoDeviceFound { tried: usize },
}

/// Failure of a command sent to a connected board.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The write did not complete in time.
    #[error("Command to {endpoint} timed out after {duration_ms}ms")]
    Timeout { endpoint: String, duration_ms: u64 },

    /// The device stream is closed.
    #[error("Device {endpoint} is closed")]
    Closed { endpoint: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] FirmataError),
}

/// Failure to configure an actuator pin.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The pin is live; release it before configuring it again.
    #[error("Pin {pin} is already configured")]
    AlreadyConfigured { pin: u8 },

    #[error("Pin {pin} is not addressable (max {max})")]
    InvalidPin { pin: u8, max: u8 },

    /// The owning device has been shut down.
    #[error("Device is closed")]
    DeviceClosed,

    #[error("Failed to configure pin {pin}: {source}")]
    Device {
        pin: u8,
        #[source]
        source: DeviceError,
    },
}

/// Failure while driving an actuator pin.
#[derive(Debug, thiserror::Error)]
pub enum ActuationError {
    /// A pin write failed. The pin is unusable from now on.
    #[error("Device unresponsive while driving pin {pin}: {source}")]
    DeviceUnresponsive {
        pin: u8,
        #[source]
        source: DeviceError,
    },

    /// An earlier write failure took this pin out of service.
    #[error("Pin {pin} is faulted")]
    PinFaulted { pin: u8 },

    /// The pin was released or never configured on this controller.
    #[error("Pin {pin} is not configured")]
    NotConfigured { pin: u8 },

    /// The owning device has been shut down.
    #[error("Device is closed")]
    DeviceClosed,
}
