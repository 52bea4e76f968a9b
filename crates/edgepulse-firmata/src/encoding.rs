//! 7-bit data encoding helpers.
//!
//! Firmata data bytes never set the high bit. Wider values are split into
//! LSB/MSB pairs of 7 bits each, and sysex strings carry every byte as such
//! a pair.

use crate::constants::MAX_DATA_BYTE;
use crate::error::{FirmataError, Result};

/// Check that `value` fits in one data byte.
pub fn data_byte(field: &'static str, value: u8) -> Result<u8> {
    if value > MAX_DATA_BYTE {
        return Err(FirmataError::out_of_range(field, u32::from(value)));
    }
    Ok(value)
}

/// Split a 14-bit value into (LSB, MSB) data bytes. Bits above 14 are dropped.
pub fn split_u14(value: u16) -> (u8, u8) {
    ((value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
}

/// Join (LSB, MSB) data bytes into a 14-bit value.
pub fn join_u14(lsb: u8, msb: u8) -> u16 {
    u16::from(lsb & 0x7F) | (u16::from(msb & 0x7F) << 7)
}

/// Encode text as 7-bit LSB/MSB pairs.
pub fn encode_string(text: &str) -> Vec<u8> {
    text.bytes().flat_map(|b| [b & 0x7F, b >> 7]).collect()
}

/// Decode 7-bit LSB/MSB pairs into text.
///
/// A trailing unpaired byte is ignored; invalid UTF-8 is replaced.
pub fn decode_string(data: &[u8]) -> String {
    let bytes: Vec<u8> = data
        .chunks_exact(2)
        .map(|pair| (pair[0] & 0x7F) | ((pair[1] & 0x01) << 7))
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
