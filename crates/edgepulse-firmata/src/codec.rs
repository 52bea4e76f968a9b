//! Tokio codecs for Firmata links.
//!
//! Both codecs wrap a [`StreamParser`] for their receive direction and plug
//! into `tokio_util::codec::Framed`:
//!
//! ```text
//! host  ── Command ──> HostCodec::encode ──> wire ──> BoardCodec::decode ──> board
//! host <── Report ─── HostCodec::decode <── wire <── BoardCodec::encode <── board
//! ```
//!
//! Frames the receiving side has no use for are skipped. Frames larger than
//! the configured limit end the stream with [`FirmataError::FrameTooLarge`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::constants::MAX_SYSEX_SIZE;
use crate::error::{FirmataError, Result};
use crate::message::{Command, Report};
use crate::stream_parser::{Direction, RawFrame, StreamParser};

/// Parser plus size limit, shared by both codecs.
#[derive(Debug)]
struct FrameReader {
    parser: StreamParser,
    max_frame_size: usize,
}

impl FrameReader {
    fn new(direction: Direction, max_frame_size: usize) -> Self {
        Self {
            parser: StreamParser::new(direction),
            max_frame_size,
        }
    }

    fn read<T>(
        &mut self,
        src: &mut BytesMut,
        interpret: fn(RawFrame) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        if !src.is_empty() {
            // All bytes are now owned by the parser
            self.parser.feed(src);
            src.clear();
        }

        while let Some(frame) = self.parser.next_frame() {
            if frame.size() > self.max_frame_size {
                return Err(FirmataError::FrameTooLarge {
                    size: frame.size(),
                    max_size: self.max_frame_size,
                });
            }

            match interpret(frame) {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => trace!("Skipping frame not relevant to this side"),
                Err(e) => debug!(error = %e, "Skipping malformed frame"),
            }
        }

        Ok(None)
    }
}

/// Host side codec: sends [`Command`]s, receives [`Report`]s.
#[derive(Debug)]
pub struct HostCodec {
    reader: FrameReader,
}

impl HostCodec {
    /// Create a codec with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_SYSEX_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            reader: FrameReader::new(Direction::FromBoard, max_frame_size),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.reader.max_frame_size
    }
}

impl Default for HostCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HostCodec {
    type Item = Report;
    type Error = FirmataError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Report>> {
        self.reader.read(src, Report::from_frame)
    }
}

impl Encoder<Command> for HostCodec {
    type Error = FirmataError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&item.to_bytes()?);
        Ok(())
    }
}

/// Board side codec: sends [`Report`]s, receives [`Command`]s.
///
/// Used by simulated boards in tests and in the binary's simulation mode.
#[derive(Debug)]
pub struct BoardCodec {
    reader: FrameReader,
}

impl BoardCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_SYSEX_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            reader: FrameReader::new(Direction::FromHost, max_frame_size),
        }
    }
}

impl Default for BoardCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BoardCodec {
    type Item = Command;
    type Error = FirmataError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        self.reader.read(src, Command::from_frame)
    }
}

impl Encoder<Report> for BoardCodec {
    type Error = FirmataError;

    fn encode(&mut self, item: Report, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&item.to_bytes()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{FirmwareReport, PinMode, Version};

    #[test]
    fn test_codec_defaults() {
        assert_eq!(HostCodec::new().max_frame_size(), MAX_SYSEX_SIZE);
        assert_eq!(HostCodec::default().max_frame_size(), MAX_SYSEX_SIZE);
    }

    #[test]
    fn test_host_decodes_handshake_replies() {
        let mut codec = HostCodec::new();
        let mut buffer = BytesMut::from(
            &[
                0xF9, 2, 5, // version
                0xF0, 0x79, 2, 5, 0x53, 0x00, 0x46, 0x00, 0xF7, // firmware "SF"
            ][..],
        );

        assert_eq!(
            codec.decode(&mut buffer).unwrap(),
            Some(Report::Version(Version::new(2, 5)))
        );
        assert_eq!(
            codec.decode(&mut buffer).unwrap(),
            Some(Report::Firmware(FirmwareReport::new(Version::new(2, 5), "SF")))
        );
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_host_partial_frame() {
        let mut codec = HostCodec::new();
        let mut buffer = BytesMut::from(&[0xF0, 0x79, 2][..]);
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        assert!(buffer.is_empty());

        buffer.extend_from_slice(&[5, 0xF7]);
        assert!(matches!(
            codec.decode(&mut buffer).unwrap(),
            Some(Report::Firmware(_))
        ));
    }

    #[test]
    fn test_host_skips_malformed_firmware_report() {
        let mut codec = HostCodec::new();
        let mut buffer = BytesMut::from(&[0xF0, 0x79, 2, 0xF7, 0xF9, 2, 5][..]);

        assert_eq!(
            codec.decode(&mut buffer).unwrap(),
            Some(Report::Version(Version::new(2, 5)))
        );
    }

    #[test]
    fn test_frame_too_large() {
        let mut codec = HostCodec::with_max_frame_size(8);
        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(&[0xF0, 0x71]);
        buffer.extend_from_slice(&[0x41; 20]);
        buffer.extend_from_slice(&[0xF7]);

        match codec.decode(&mut buffer) {
            Err(FirmataError::FrameTooLarge { size, max_size }) => {
                assert_eq!(size, 23);
                assert_eq!(max_size, 8);
            }
            other => panic!("Expected FrameTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_host_encodes_commands() {
        let mut codec = HostCodec::new();
        let mut buffer = BytesMut::new();

        codec.encode(Command::QueryVersion, &mut buffer).unwrap();
        codec.encode(Command::QueryFirmware, &mut buffer).unwrap();
        codec
            .encode(
                Command::SetPinMode {
                    pin: 6,
                    mode: PinMode::Output,
                },
                &mut buffer,
            )
            .unwrap();

        assert_eq!(&buffer[..], &[0xF9, 0xF0, 0x79, 0xF7, 0xF4, 6, 1]);
    }

    #[test]
    fn test_board_decodes_host_commands() {
        let mut codec = BoardCodec::new();
        let mut buffer = BytesMut::from(&[0xF9, 0xF0, 0x79, 0xF7, 0xF5, 6, 1, 0xF5, 6, 0][..]);

        let mut commands = Vec::new();
        while let Some(command) = codec.decode(&mut buffer).unwrap() {
            commands.push(command);
        }

        assert_eq!(
            commands,
            vec![
                Command::QueryVersion,
                Command::QueryFirmware,
                Command::SetDigitalPinValue { pin: 6, high: true },
                Command::SetDigitalPinValue {
                    pin: 6,
                    high: false
                },
            ]
        );
    }

    #[test]
    fn test_board_skips_reporting_toggles() {
        let mut codec = BoardCodec::new();
        let mut buffer = BytesMut::from(&[0xD0, 1, 0xC0, 1, 0xFF][..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Command::SystemReset));
    }

    #[test]
    fn test_board_encodes_reports() {
        let mut codec = BoardCodec::default();
        let mut buffer = BytesMut::new();

        codec
            .encode(Report::Version(Version::new(2, 5)), &mut buffer)
            .unwrap();
        assert_eq!(&buffer[..], &[0xF9, 2, 5]);
    }
}
