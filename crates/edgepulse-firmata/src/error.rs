//! Error types for Firmata encoding and decoding.

/// Result type alias for Firmata operations.
pub type Result<T> = std::result::Result<T, FirmataError>;

/// Errors raised while framing or interpreting Firmata traffic.
#[derive(Debug, thiserror::Error)]
pub enum FirmataError {
    /// A frame exceeded the codec's size limit.
    #[error("Frame too large: {size} bytes (max {max_size})")]
    FrameTooLarge { size: usize, max_size: usize },

    /// A data field does not fit in the 7-bit protocol encoding.
    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: u32 },

    /// A complete frame could not be interpreted.
    #[error("Malformed frame: {message}")]
    Malformed { message: String },

    /// Underlying stream error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FirmataError {
    /// Create a new malformed frame error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a new out-of-range error.
    pub fn out_of_range(field: &'static str, value: u32) -> Self {
        Self::OutOfRange { field, value }
    }
}
