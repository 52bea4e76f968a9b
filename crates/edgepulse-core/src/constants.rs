//! Process-wide defaults for the actuation bridge.
//!
//! Every value here can be overridden by configuration. They exist so the
//! library crates, the binary and the tests agree on one set of numbers.
//!
//! # Usage
//!
//! ```
//! use edgepulse_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_BAUD_RATE, 115_200);
//! let timeout = Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 5);
//! ```

// ============================================================================
// Serial Link
// ============================================================================

/// Baud rate used by StandardFirmata sketches.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Candidate endpoints tried when no list is configured.
pub const DEFAULT_PORTS: &str = "/dev/ttyS1,/dev/ttyS2,/dev/ttyS3,/dev/ttyS4";

/// Characters that separate entries in a configured candidate list.
///
/// Any whitespace also separates entries.
pub const CANDIDATE_DELIMITERS: &[char] = &[','];

/// Upper bound for the compatibility handshake on one endpoint (milliseconds).
///
/// Boards that reset on open (most Arduino-class boards) need a couple of
/// seconds before the firmware answers.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5000;

/// Upper bound for a single command write once connected (milliseconds).
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Actuator
// ============================================================================

/// Digital pin driven when no pin is configured.
pub const DEFAULT_ACTUATOR_PIN: u8 = 6;

/// Highest pin number addressable with Firmata's 7-bit pin field.
pub const MAX_PIN_NUMBER: u8 = 127;

/// Time the actuator stays high in one pulse (milliseconds).
pub const DEFAULT_PULSE_HIGH_MS: u64 = 500;

/// Time the actuator stays low after one pulse (milliseconds).
pub const DEFAULT_PULSE_LOW_MS: u64 = 500;

/// Pulses emitted per worthy message.
pub const DEFAULT_PULSES_PER_EVENT: u32 = 1;

// ============================================================================
// Relay
// ============================================================================

/// Messages handled concurrently before the loop stops taking new ones.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

// ============================================================================
// Detection Payload
// ============================================================================

/// Number of coordinates in a detection bounding box.
pub const BBOX_LEN: usize = 4;
