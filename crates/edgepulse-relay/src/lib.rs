//! Message relay for the edgepulse bridge.
//!
//! Every inbound message is forwarded downstream unchanged. Messages whose
//! payload carries at least one detection also trigger one actuation on the
//! way through.
//!
//! - [`gate`]: pure decision on a payload
//! - [`RelayPipeline`]: per-message handling over the [`Actuate`] and
//!   [`MessageSink`] seams
//! - [`transport`]: source and sink traits plus channel-backed versions
//!
//! [`Actuate`]: edgepulse_hardware::Actuate

pub mod error;
pub mod gate;
pub mod pipeline;
pub mod transport;

pub use error::{GateError, RelayError, SinkError, SourceError};
pub use gate::{decode_body, evaluate, is_actuation_worthy};
pub use pipeline::{MessageStage, RelayPipeline};
pub use transport::{Acknowledgment, ChannelSink, ChannelSource, MessageSink, MessageSource};
