//! Firmata wire protocol for the actuation bridge.
//!
//! Firmata is the MIDI-derived protocol spoken by StandardFirmata and
//! ConfigurableFirmata sketches. The bridge only needs a small part of it:
//! the version/firmware handshake and digital output control. Everything
//! else a board may report is decoded far enough to be skipped safely.
//!
//! # Directions
//!
//! The same command byte means different things depending on who sends it
//! (`0xF9` is a bare query from the host but carries two version bytes from
//! the board), so each side of the link has its own codec:
//!
//! - [`HostCodec`]: encodes [`Command`], decodes [`Report`]
//! - [`BoardCodec`]: encodes [`Report`], decodes [`Command`] (used by
//!   simulated boards)
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use tokio_util::codec::Framed;
//! use edgepulse_firmata::{Command, HostCodec, Report};
//!
//! # async fn example(stream: tokio::io::DuplexStream) -> Result<(), edgepulse_firmata::FirmataError> {
//! let mut framed = Framed::new(stream, HostCodec::new());
//! framed.send(Command::QueryFirmware).await?;
//!
//! if let Some(Ok(Report::Firmware(firmware))) = framed.next().await {
//!     println!("{} {}", firmware.name, firmware.version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod message;
pub mod stream_parser;

pub use codec::{BoardCodec, HostCodec};
pub use error::{FirmataError, Result};
pub use message::{Command, FirmwareReport, PinMode, Report, Version};
pub use stream_parser::{Direction, ParserState, RawFrame, StreamParser};
