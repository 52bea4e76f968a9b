//! Message envelopes exchanged with the bus collaborators.

use bytes::Bytes;
use std::collections::HashMap;
use uuid::Uuid;

/// Application properties attached to a message.
pub type Properties = HashMap<String, String>;

/// A message delivered by the upstream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Delivery identity assigned by the source.
    pub id: String,

    pub payload: Bytes,

    pub properties: Properties,
}

impl InboundMessage {
    pub fn new(id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            properties: Properties::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A fresh envelope carrying the same content as an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub id: Uuid,

    pub payload: Bytes,

    pub properties: Properties,
}

impl OutboundMessage {
    /// Copy payload and properties of `inbound` into a new envelope.
    #[must_use]
    pub fn relay_of(inbound: &InboundMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: inbound.payload.clone(),
            properties: inbound.properties.clone(),
        }
    }
}

/// Acknowledgment returned to the source for each delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageResponse {
    Completed,
}
