//! Detection payload schema.
//!
//! Upstream perception modules publish a JSON array of detections:
//!
//! ```json
//! [{"bbox": [0, 0, 10, 10], "label": "person", "confidence": "0.87", "timestamp": "t1"}]
//! ```
//!
//! The confidence is published as text by some models and as a number by
//! others, so both are accepted.

use crate::constants::BBOX_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detection confidence as published upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Number(f64),
    Text(String),
}

impl Confidence {
    /// Numeric value, if the confidence is a number or numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One recognized object in a perception result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Bounding box coordinates as published (x1, y1, x2, y2).
    pub bbox: [f64; BBOX_LEN],

    pub label: String,

    pub confidence: Confidence,

    pub timestamp: String,
}

/// Ordered detections carried by one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBody(Vec<DetectionEvent>);

impl MessageBody {
    #[must_use]
    pub fn new(events: Vec<DetectionEvent>) -> Self {
        Self(events)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn events(&self) -> &[DetectionEvent] {
        &self.0
    }

    /// Labels of all detections, in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|event| event.label.as_str())
    }
}

impl From<Vec<DetectionEvent>> for MessageBody {
    fn from(events: Vec<DetectionEvent>) -> Self {
        Self(events)
    }
}
