//! Seams to the upstream source and the downstream sink.
//!
//! The pipeline never talks to a broker directly. A [`MessageSource`] yields
//! deliveries and receives exactly one [`Acknowledgment`] per delivery; a
//! [`MessageSink`] accepts forwarded messages. The channel-backed
//! implementations here connect the pipeline to anything that can speak
//! `tokio::sync::mpsc`.

use std::future::Future;

use edgepulse_core::{InboundMessage, MessageResponse, OutboundMessage};
use tokio::sync::mpsc;

use crate::error::{RelayError, SinkError, SourceError};

/// Downstream destination for forwarded messages.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: OutboundMessage) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Upstream delivery of inbound messages.
pub trait MessageSource: Send {
    /// Next delivery, or `None` once the source is exhausted.
    fn next_message(
        &mut self,
    ) -> impl Future<Output = Result<Option<InboundMessage>, SourceError>> + Send;

    /// Settle a delivery previously returned by `next_message`.
    fn acknowledge(
        &mut self,
        id: &str,
        ack: Acknowledgment,
    ) -> impl Future<Output = ()> + Send;
}

/// Outcome reported back to the source for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgment {
    Completed,

    /// The message was not handled and may be redelivered.
    Rejected { reason: String },
}

impl Acknowledgment {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<&Result<MessageResponse, RelayError>> for Acknowledgment {
    fn from(result: &Result<MessageResponse, RelayError>) -> Self {
        match result {
            Ok(MessageResponse::Completed) => Self::Completed,
            Err(e) => Self::Rejected {
                reason: e.to_string(),
            },
        }
    }
}

/// Sink that pushes forwarded messages into a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<OutboundMessage>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end of a channel of `capacity` messages.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl MessageSink for ChannelSink {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
        self.tx.send(message).await.map_err(|_| SinkError::Closed)
    }
}

/// Source that reads deliveries from a channel and reports acknowledgments
/// on another.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<InboundMessage>,
    acks: mpsc::UnboundedSender<(String, Acknowledgment)>,
}

impl ChannelSource {
    /// Returns the source, the sender to feed it, and the receiver of
    /// `(delivery id, ack)` pairs.
    pub fn channel(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Sender<InboundMessage>,
        mpsc::UnboundedReceiver<(String, Acknowledgment)>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        (Self { rx, acks: ack_tx }, tx, ack_rx)
    }
}

impl MessageSource for ChannelSource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, SourceError> {
        Ok(self.rx.recv().await)
    }

    async fn acknowledge(&mut self, id: &str, ack: Acknowledgment) {
        // Nobody listening for acks is not an error
        let _ = self.acks.send((id.to_string(), ack));
    }
}
