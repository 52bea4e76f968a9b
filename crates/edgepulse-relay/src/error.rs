//! Error types for the relay.

/// A payload that is not a detection list.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Payload is not a detection list: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to hand a message to the downstream transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The downstream side is gone.
    #[error("Output is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Failure to read the next message from upstream.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A delivery that cannot be turned into an inbound message.
    #[error("Malformed delivery: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a message handler; reported upstream as a negative ack.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Forwarding failed; the message may be redelivered.
    #[error("Failed to forward message: {0}")]
    Forward(#[from] SinkError),
}

impl RelayError {
    /// Whether the source may redeliver the message.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Forward(_) => true,
        }
    }
}
