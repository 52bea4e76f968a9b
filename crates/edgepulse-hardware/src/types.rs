//! Plain data types shared across the hardware layer.

use std::fmt;
use std::time::Duration;

use edgepulse_core::constants::{DEFAULT_PULSE_HIGH_MS, DEFAULT_PULSE_LOW_MS};
use edgepulse_firmata::{FirmwareReport, PinMode, Version};

/// What a board reported about itself during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Endpoint the board answered on.
    pub endpoint: String,

    /// Firmata protocol version (`REPORT_VERSION`).
    pub protocol_version: Version,

    /// Firmware version and build identifier (`REPORT_FIRMWARE`).
    pub firmware: FirmwareReport,
}

impl DeviceInfo {
    pub fn firmware_version(&self) -> Version {
        self.firmware.version
    }

    pub fn firmware_name(&self) -> &str {
        &self.firmware.name
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} on {} (protocol {})",
            self.firmware.name, self.firmware.version, self.endpoint, self.protocol_version
        )
    }
}

/// A configured output line on the connected board.
///
/// Only [`ActuatorController::configure`](crate::ActuatorController::configure)
/// hands these out, and a pin is only accepted by the controller that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActuatorPin {
    number: u8,
    mode: PinMode,
    controller: u64,
}

impl ActuatorPin {
    pub(crate) fn new(number: u8, mode: PinMode, controller: u64) -> Self {
        Self {
            number,
            mode,
            controller,
        }
    }

    pub(crate) fn controller_id(&self) -> u64 {
        self.controller
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn mode(&self) -> PinMode {
        self.mode
    }
}

impl fmt::Display for ActuatorPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin {} ({})", self.number, self.mode)
    }
}

/// High and low durations of one pulse cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub high: Duration,
    pub low: Duration,
}

impl PulseTiming {
    pub fn new(high: Duration, low: Duration) -> Self {
        Self { high, low }
    }

    pub fn from_millis(high_ms: u64, low_ms: u64) -> Self {
        Self::new(Duration::from_millis(high_ms), Duration::from_millis(low_ms))
    }

    /// Wall time of one full cycle.
    pub fn period(&self) -> Duration {
        self.high + self.low
    }
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self::from_millis(DEFAULT_PULSE_HIGH_MS, DEFAULT_PULSE_LOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo {
            endpoint: "/dev/ttyACM1".to_string(),
            protocol_version: Version::new(2, 5),
            firmware: FirmwareReport::new(Version::new(2, 11), "StandardFirmata.ino"),
        };
        assert_eq!(info.firmware_version(), Version::new(2, 11));
        assert_eq!(info.firmware_name(), "StandardFirmata.ino");
        assert_eq!(
            info.to_string(),
            "StandardFirmata.ino v2.11 on /dev/ttyACM1 (protocol 2.5)"
        );
    }

    #[test]
    fn test_pulse_timing_default() {
        let timing = PulseTiming::default();
        assert_eq!(timing.high, Duration::from_millis(500));
        assert_eq!(timing.low, Duration::from_millis(500));
        assert_eq!(timing.period(), Duration::from_secs(1));
    }
}
