//! Per-message handling: gate, actuate, forward.
//!
//! ```text
//! Received ─> Decoded ─> Gated ─┬─> Actuated ─┬─> Forwarded ─> Completed
//!    │                          └─────────────┤
//!    └── (not UTF-8) ─────────────────────────┘
//! ```
//!
//! Decode and actuation failures are logged and never stop forwarding. Only
//! a failed forward is returned to the caller, which reports it upstream as
//! a negative acknowledgment. Nothing is retried here.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use edgepulse_core::{InboundMessage, MessageResponse, OutboundMessage};
use edgepulse_hardware::Actuate;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::gate;
use crate::transport::MessageSink;

/// Where a message is in the pipeline, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStage {
    Received,
    Decoded,
    Gated,
    Actuated,
    Forwarded,
    Completed,
}

impl fmt::Display for MessageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::Gated => "gated",
            Self::Actuated => "actuated",
            Self::Forwarded => "forwarded",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Relays inbound messages downstream, actuating on detections.
///
/// Safe to share across tasks; handlers for different messages run
/// concurrently.
#[derive(Debug)]
pub struct RelayPipeline<A, K> {
    actuator: A,
    sink: K,
    received: AtomicU64,
}

impl<A: Actuate, K: MessageSink> RelayPipeline<A, K> {
    pub fn new(actuator: A, sink: K) -> Self {
        Self {
            actuator,
            sink,
            received: AtomicU64::new(0),
        }
    }

    /// Messages received so far.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Handle one delivery.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Forward`] if the sink rejects the copy.
    pub async fn on_message(&self, inbound: &InboundMessage) -> Result<MessageResponse, RelayError> {
        let seq = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            seq,
            id = %inbound.id,
            bytes = inbound.payload.len(),
            stage = %MessageStage::Received,
            "Message received"
        );

        match std::str::from_utf8(&inbound.payload) {
            Ok(text) => {
                debug!(seq, stage = %MessageStage::Decoded, body = text, "Payload decoded");

                let worthy = gate::evaluate(text).unwrap_or_else(|e| {
                    warn!(seq, error = %e, "Payload is not a detection list");
                    false
                });
                debug!(seq, stage = %MessageStage::Gated, worthy, "Payload gated");

                if worthy {
                    match self.actuator.actuate().await {
                        Ok(()) => debug!(seq, stage = %MessageStage::Actuated, "Actuated"),
                        Err(e) => warn!(seq, error = %e, "Actuation failed, forwarding anyway"),
                    }
                }
            }
            Err(e) => warn!(seq, error = %e, "Payload is not valid UTF-8"),
        }

        if inbound.is_empty() {
            debug!(seq, "Empty payload, nothing to forward");
        } else {
            let outbound = OutboundMessage::relay_of(inbound);
            let outbound_id = outbound.id;
            self.sink.send(outbound).await.inspect_err(|e| {
                warn!(seq, error = %e, "Forwarding failed");
            })?;
            debug!(seq, stage = %MessageStage::Forwarded, %outbound_id, "Message forwarded");
        }

        debug!(seq, stage = %MessageStage::Completed, "Message completed");
        Ok(MessageResponse::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::transport::ChannelSink;
    use edgepulse_hardware::ActuationError;
    use std::sync::atomic::AtomicUsize;

    const PERSON: &str =
        r#"[{"bbox":[0,0,10,10],"label":"person","confidence":"0.87","timestamp":"t1"}]"#;

    #[derive(Debug, Default)]
    struct CountingActuator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingActuator {
        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Actuate for CountingActuator {
        async fn actuate(&self) -> Result<(), ActuationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ActuationError::PinFaulted { pin: 6 })
            } else {
                Ok(())
            }
        }
    }

    struct RejectingSink;

    impl MessageSink for RejectingSink {
        async fn send(&self, _message: OutboundMessage) -> Result<(), SinkError> {
            Err(SinkError::Transport("broker unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_worthy_message_actuates_and_forwards() {
        let (sink, mut rx) = ChannelSink::channel(4);
        let pipeline = RelayPipeline::new(CountingActuator::default(), sink);
        let inbound = InboundMessage::new("d-1", PERSON).with_property("camera", "north");

        let response = pipeline.on_message(&inbound).await.unwrap();

        assert_eq!(response, MessageResponse::Completed);
        assert_eq!(pipeline.actuator().calls(), 1);
        let forwarded = rx.recv().await.unwrap();
        assert_eq!(forwarded.payload, inbound.payload);
        assert_eq!(forwarded.properties, inbound.properties);
    }

    #[tokio::test]
    async fn test_empty_detection_list_forwards_without_actuation() {
        let (sink, mut rx) = ChannelSink::channel(4);
        let pipeline = RelayPipeline::new(CountingActuator::default(), sink);

        pipeline
            .on_message(&InboundMessage::new("d-2", "[]"))
            .await
            .unwrap();

        assert_eq!(pipeline.actuator().calls(), 0);
        assert_eq!(&rx.recv().await.unwrap().payload[..], b"[]");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_forwarded_untouched() {
        let (sink, mut rx) = ChannelSink::channel(4);
        let pipeline = RelayPipeline::new(CountingActuator::default(), sink);
        let inbound = InboundMessage::new("d-3", vec![0xFF, 0xFE, 0x00]);

        let response = pipeline.on_message(&inbound).await.unwrap();

        assert_eq!(response, MessageResponse::Completed);
        assert_eq!(pipeline.actuator().calls(), 0);
        assert_eq!(&rx.recv().await.unwrap().payload[..], &[0xFF, 0xFE, 0x00]);
    }

    #[tokio::test]
    async fn test_actuation_failure_still_forwards() {
        let (sink, mut rx) = ChannelSink::channel(4);
        let pipeline = RelayPipeline::new(CountingActuator::failing(), sink);

        let response = pipeline
            .on_message(&InboundMessage::new("d-4", PERSON))
            .await
            .unwrap();

        assert_eq!(response, MessageResponse::Completed);
        assert_eq!(pipeline.actuator().calls(), 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_empty_payload_is_not_forwarded() {
        let (sink, mut rx) = ChannelSink::channel(4);
        let pipeline = RelayPipeline::new(CountingActuator::default(), sink);

        let response = pipeline
            .on_message(&InboundMessage::new("d-5", ""))
            .await
            .unwrap();

        assert_eq!(response, MessageResponse::Completed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forward_failure_is_returned() {
        let pipeline = RelayPipeline::new(CountingActuator::default(), RejectingSink);

        let result = pipeline.on_message(&InboundMessage::new("d-6", PERSON)).await;

        assert!(matches!(
            result,
            Err(RelayError::Forward(SinkError::Transport(_)))
        ));
        // Actuation happened before the forward failed
        assert_eq!(pipeline.actuator().calls(), 1);
    }

    #[tokio::test]
    async fn test_received_counter() {
        let (sink, _rx) = ChannelSink::channel(8);
        let pipeline = RelayPipeline::new(CountingActuator::default(), sink);

        for n in 0..3 {
            pipeline
                .on_message(&InboundMessage::new(n.to_string(), "null"))
                .await
                .unwrap();
        }
        assert_eq!(pipeline.received(), 3);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(MessageStage::Forwarded.to_string(), "forwarded");
    }
}
