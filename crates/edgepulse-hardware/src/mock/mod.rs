//! Mock hardware for development and testing.
//!
//! Nothing here touches real devices. [`MockPortOpener`] stands in for
//! [`SerialPortOpener`](crate::SerialPortOpener) and hands out in-memory
//! streams, some of which are served by a [`MockBoard`].

mod board;
mod opener;

pub use board::{MockBoard, MockBoardHandle, RecordedCommand};
pub use opener::{MockEndpoint, MockPortOpener};
