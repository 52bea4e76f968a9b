pub mod constants;
pub mod detection;
pub mod endpoint;
pub mod error;
pub mod message;

pub use detection::{Confidence, DetectionEvent, MessageBody};
pub use endpoint::EndpointCandidate;
pub use error::{Error, Result};
pub use message::{InboundMessage, MessageResponse, OutboundMessage, Properties};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
