//! Firmata command bytes and limits.
//!
//! Bytes with the high bit set are commands; data bytes are 7-bit. Values
//! follow the Firmata 2.x protocol documentation.

// ============================================================================
// Channel Commands (low nibble carries port or pin)
// ============================================================================

/// Digital port value (`0x90 | port`, LSB, MSB).
pub const DIGITAL_MESSAGE: u8 = 0x90;

/// Analog pin value (`0xE0 | pin`, LSB, MSB).
pub const ANALOG_MESSAGE: u8 = 0xE0;

/// Enable/disable analog reporting (`0xC0 | pin`, flag).
pub const REPORT_ANALOG: u8 = 0xC0;

/// Enable/disable digital port reporting (`0xD0 | port`, flag).
pub const REPORT_DIGITAL: u8 = 0xD0;

// ============================================================================
// System Commands
// ============================================================================

/// Start of a sysex frame.
pub const START_SYSEX: u8 = 0xF0;

/// Set a pin's mode (pin, mode).
pub const SET_PIN_MODE: u8 = 0xF4;

/// Set a single digital pin value (pin, value). Firmata 2.5+.
pub const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;

/// End of a sysex frame.
pub const END_SYSEX: u8 = 0xF7;

/// Protocol version query (host) or report (board: major, minor).
pub const REPORT_VERSION: u8 = 0xF9;

/// Reset the board to its power-on state.
pub const SYSTEM_RESET: u8 = 0xFF;

// ============================================================================
// Sysex Commands
// ============================================================================

/// Text message from the board, 7-bit encoded.
pub const STRING_DATA: u8 = 0x71;

/// Firmware name and version query/report.
pub const REPORT_FIRMWARE: u8 = 0x79;

// ============================================================================
// Limits
// ============================================================================

/// Largest value carried by a data byte.
pub const MAX_DATA_BYTE: u8 = 0x7F;

/// Largest sysex body accepted before the frame is discarded.
///
/// StandardFirmata's own input buffer is 64 bytes; capability and string
/// reports from larger boards stay well below this.
pub const MAX_SYSEX_SIZE: usize = 1024;
