//! Stream parser for Firmata traffic.
//!
//! Serial links have no message boundaries and boards print boot noise
//! before their firmware starts, so the parser accumulates bytes and
//! extracts complete frames with a small state machine.
//!
//! # Framing
//!
//! - Channel messages: one command byte (high bit set) followed by a fixed
//!   number of data bytes. The count depends on the command and on which
//!   side sent it, see [`Direction`].
//! - Sysex messages: `0xF0`, a sysex command byte, any number of data bytes,
//!   `0xF7`.
//!
//! Data bytes with no command in front of them, unknown commands and
//! messages cut short by a new command byte are discarded.
//!
//! ```
//! use edgepulse_firmata::{Direction, RawFrame, StreamParser};
//!
//! let mut parser = StreamParser::new(Direction::FromBoard);
//!
//! // Boot noise, then a version report split across two reads
//! parser.feed(&[0x00, 0x13, 0xF9, 0x02]);
//! assert!(parser.next_frame().is_none());
//!
//! parser.feed(&[0x05]);
//! assert_eq!(
//!     parser.next_frame(),
//!     Some(RawFrame::Channel { command: 0xF9, data: vec![2, 5] })
//! );
//! ```

use std::collections::VecDeque;

use crate::constants::{
    END_SYSEX, REPORT_VERSION, SET_DIGITAL_PIN_VALUE, SET_PIN_MODE, START_SYSEX, SYSTEM_RESET,
};

/// Sysex bodies longer than this are dropped by the parser itself.
///
/// Codecs apply their own, usually smaller, limit on top.
const MAX_BUFFERED_SYSEX: usize = 64 * 1024;

/// Initial capacity for frame assembly.
const INITIAL_PAYLOAD_CAPACITY: usize = 64;

/// Initial capacity of the frame queue.
const INITIAL_FRAME_QUEUE_CAPACITY: usize = 4;

/// Which side of the link produced the bytes being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reports sent by the board, parsed by the host.
    FromBoard,

    /// Commands sent by the host, parsed by the board.
    FromHost,
}

impl Direction {
    /// Number of data bytes following `command`, or `None` if unknown.
    fn data_len(self, command: u8) -> Option<usize> {
        let channel = command & 0xF0;
        match self {
            Self::FromBoard => match command {
                REPORT_VERSION => Some(2),
                _ if channel == 0x90 || channel == 0xE0 => Some(2),
                _ => None,
            },
            Self::FromHost => match command {
                REPORT_VERSION | SYSTEM_RESET => Some(0),
                SET_PIN_MODE | SET_DIGITAL_PIN_VALUE => Some(2),
                _ if channel == 0x90 || channel == 0xE0 => Some(2),
                _ if channel == 0xC0 || channel == 0xD0 => Some(1),
                _ => None,
            },
        }
    }
}

/// A complete frame, not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// Command byte plus its fixed data bytes.
    Channel { command: u8, data: Vec<u8> },

    /// Sysex command byte plus body, without the start/end markers.
    Sysex { command: u8, data: Vec<u8> },
}

impl RawFrame {
    /// Size of the frame on the wire.
    pub fn size(&self) -> usize {
        match self {
            Self::Channel { data, .. } => 1 + data.len(),
            Self::Sysex { data, .. } => 3 + data.len(),
        }
    }
}

/// State machine states for frame extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for a command byte. Data bytes are discarded.
    WaitingCommand,

    /// Collecting the fixed data bytes of a channel message.
    ReadingData,

    /// Collecting a sysex body until `0xF7`.
    ReadingSysex,
}

/// Stateful parser for one direction of a Firmata link.
///
/// ```text
/// ┌───────────────┐  known cmd   ┌─────────────┐  last data byte
/// │WaitingCommand │─────────────>│ ReadingData │──────────────┐
/// └───────────────┘              └─────────────┘              │
///     │   ^    ^                        │ command byte        │
///     │   │    └────────────────────────┘ (message dropped)   │
///     │   │                                                   │
///     │   └─────────────────────── frame queued <─────────────┘
///     │ 0xF0                         ^
///     v                              │ 0xF7
/// ┌──────────────┐───────────────────┘
/// │ ReadingSysex │
/// └──────────────┘
/// ```
#[derive(Debug)]
pub struct StreamParser {
    direction: Direction,

    state: ParserState,

    /// Command byte of the channel message being collected.
    command: u8,

    /// Data bytes the current channel message needs.
    expected: usize,

    /// Data bytes (channel) or body (sysex) collected so far.
    payload: Vec<u8>,

    /// Complete frames ready for extraction.
    frames: VecDeque<RawFrame>,

    /// Bytes dropped since creation.
    discarded: usize,
}

impl StreamParser {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            state: ParserState::WaitingCommand,
            command: 0,
            expected: 0,
            payload: Vec::with_capacity(INITIAL_PAYLOAD_CAPACITY),
            frames: VecDeque::with_capacity(INITIAL_FRAME_QUEUE_CAPACITY),
            discarded: 0,
        }
    }

    /// Feed bytes read from the link.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push_byte(byte);
        }
    }

    /// Next complete frame, if any.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        self.frames.pop_front()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn frames_available(&self) -> usize {
        self.frames.len()
    }

    /// Number of bytes dropped as noise or partial messages.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Drop all buffered state, including queued frames.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.reset();
    }

    fn push_byte(&mut self, byte: u8) {
        match self.state {
            ParserState::WaitingCommand => self.start_command(byte),
            ParserState::ReadingData => self.continue_data(byte),
            ParserState::ReadingSysex => self.continue_sysex(byte),
        }
    }

    fn start_command(&mut self, byte: u8) {
        if !is_command(byte) {
            self.discarded += 1;
            return;
        }

        if byte == START_SYSEX {
            self.payload.clear();
            self.state = ParserState::ReadingSysex;
            return;
        }

        match self.direction.data_len(byte) {
            Some(0) => self.frames.push_back(RawFrame::Channel {
                command: byte,
                data: Vec::new(),
            }),
            Some(expected) => {
                self.command = byte;
                self.expected = expected;
                self.payload.clear();
                self.state = ParserState::ReadingData;
            }
            None => self.discarded += 1,
        }
    }

    fn continue_data(&mut self, byte: u8) {
        if is_command(byte) {
            self.abandon_current();
            self.start_command(byte);
            return;
        }

        self.payload.push(byte);
        if self.payload.len() == self.expected {
            self.frames.push_back(RawFrame::Channel {
                command: self.command,
                data: std::mem::take(&mut self.payload),
            });
            self.reset();
        }
    }

    fn continue_sysex(&mut self, byte: u8) {
        if byte == END_SYSEX {
            self.finish_sysex();
            return;
        }

        if is_command(byte) {
            self.abandon_current();
            self.start_command(byte);
            return;
        }

        if self.payload.len() >= MAX_BUFFERED_SYSEX {
            // Oversized body: drop it and let the rest fall through as noise
            self.abandon_current();
            self.discarded += 1;
            return;
        }

        self.payload.push(byte);
    }

    fn finish_sysex(&mut self) {
        if self.payload.is_empty() {
            // F0 F7 carries no command
            self.discarded += 2;
        } else {
            let mut body = std::mem::take(&mut self.payload);
            let command = body.remove(0);
            self.frames.push_back(RawFrame::Sysex {
                command,
                data: body,
            });
        }
        self.reset();
    }

    fn abandon_current(&mut self) {
        // +1 for the command or sysex start byte
        self.discarded += self.payload.len() + 1;
        self.reset();
    }

    fn reset(&mut self) {
        self.state = ParserState::WaitingCommand;
        self.command = 0;
        self.expected = 0;
        self.payload.clear();
    }
}

fn is_command(byte: u8) -> bool {
    byte & 0x80 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_report_from_board() {
        let mut parser = StreamParser::new(Direction::FromBoard);
        parser.feed(&[0xF9, 2, 5]);

        assert_eq!(
            parser.next_frame(),
            Some(RawFrame::Channel {
                command: 0xF9,
                data: vec![2, 5]
            })
        );
        assert_eq!(parser.state(), ParserState::WaitingCommand);
    }

    #[test]
    fn test_version_query_from_host_has_no_data() {
        let mut parser = StreamParser::new(Direction::FromHost);
        parser.feed(&[0xF9, 0xF4, 6, 1]);

        assert_eq!(
            parser.next_frame(),
            Some(RawFrame::Channel {
                command: 0xF9,
                data: vec![]
            })
        );
        assert_eq!(
            parser.next_frame(),
            Some(RawFrame::Channel {
                command: 0xF4,
                data: vec![6, 1]
            })
        );
    }

    #[test]
    fn test_sysex_across_feeds() {
        let mut parser = StreamParser::new(Direction::FromBoard);
        parser.feed(&[0xF0, 0x79, 2]);
        assert_eq!(parser.state(), ParserState::ReadingSysex);
        assert!(parser.next_frame().is_none());

        parser.feed(&[5, 0x41, 0x00, 0xF7]);
        assert_eq!(
            parser.next_frame(),
            Some(RawFrame::Sysex {
                command: 0x79,
                data: vec![2, 5, 0x41, 0x00]
            })
        );
    }

    #[test]
    fn test_leading_noise_is_discarded() {
        let mut parser = StreamParser::new(Direction::FromBoard);
        parser.feed(b"boot\r\n");
        parser.feed(&[0xF9, 2, 5]);

        assert_eq!(parser.frames_available(), 1);
        assert_eq!(parser.discarded(), 6);
    }

    #[test]
    fn test_interrupted_message_is_dropped() {
        let mut parser = StreamParser::new(Direction::FromBoard);
        // Version report cut off by a digital port message
        parser.feed(&[0xF9, 2, 0x90, 0x01, 0x00]);

        assert_eq!(
            parser.next_frame(),
            Some(RawFrame::Channel {
                command: 0x90,
                data: vec![0x01, 0x00]
            })
        );
        assert!(parser.next_frame().is_none());
        assert_eq!(parser.discarded(), 2);
    }

    #[test]
    fn test_unknown_command_is_skipped() {
        let mut parser = StreamParser::new(Direction::FromBoard);
        parser.feed(&[0xF4, 6, 1, 0xF9, 2, 6]);

        let frames: Vec<_> = std::iter::from_fn(|| parser.next_frame()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].size(), 3);
    }

    #[test]
    fn test_empty_sysex_is_dropped() {
        let mut parser = StreamParser::new(Direction::FromHost);
        parser.feed(&[0xF0, 0xF7, 0xFF]);

        assert_eq!(
            parser.next_frame(),
            Some(RawFrame::Channel {
                command: 0xFF,
                data: vec![]
            })
        );
        assert!(parser.next_frame().is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut parser = StreamParser::new(Direction::FromBoard);
        parser.feed(&[0xF9, 2, 5, 0xF0, 0x79]);
        parser.clear();

        assert_eq!(parser.frames_available(), 0);
        assert_eq!(parser.state(), ParserState::WaitingCommand);
        assert_eq!(parser.direction(), Direction::FromBoard);
    }
}
