//! JSON-lines transport over standard input and output.
//!
//! Each line is one envelope:
//!
//! ```json
//! {"id": "delivery-1", "payload": "[...]", "properties": {"camera": "north"}}
//! ```
//!
//! Binary payloads use `payload_b64` (standard base64) instead of `payload`.
//! Forwarded messages are written to stdout in the same shape, under their
//! new id. Logs go to stderr.

use std::collections::HashMap;
use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use edgepulse_core::{InboundMessage, OutboundMessage};
use edgepulse_relay::{Acknowledgment, MessageSink, MessageSource, SinkError, SourceError};
use serde::{Deserialize, Serialize};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

const READ_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Envelope {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload_b64: Option<String>,
    #[serde(default)]
    properties: HashMap<String, String>,
}

/// Turn one input line into an inbound message.
fn parse_line(line: &str) -> Result<InboundMessage, SourceError> {
    let envelope: Envelope =
        serde_json::from_str(line).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let payload = match (envelope.payload_b64, envelope.payload) {
        (Some(encoded), _) => STANDARD
            .decode(encoded.trim())
            .map_err(|e| SourceError::Malformed(format!("payload_b64: {e}")))?,
        (None, Some(text)) => text.into_bytes(),
        (None, None) => Vec::new(),
    };

    let mut message = InboundMessage::new(envelope.id, payload);
    message.properties = envelope.properties;
    Ok(message)
}

/// Render a forwarded message as one output line (without the newline).
fn render_line(message: &OutboundMessage) -> Result<String, SinkError> {
    let (payload, payload_b64) = match std::str::from_utf8(&message.payload) {
        Ok(text) => (Some(text.to_string()), None),
        Err(_) => (None, Some(STANDARD.encode(&message.payload))),
    };

    let envelope = Envelope {
        id: message.id.to_string(),
        payload,
        payload_b64,
        properties: message.properties.clone(),
    };
    serde_json::to_string(&envelope).map_err(|e| SinkError::Transport(e.to_string()))
}

/// Reads envelopes line by line.
#[derive(Debug)]
pub struct LineSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl LineSource<BufReader<DuplexStream>> {
    /// Standard input, read on a detached thread.
    ///
    /// The thread is never joined, so the runtime can shut down while stdin
    /// is open and idle.
    pub fn stdin() -> std::io::Result<Self> {
        let stream = spawn_reader("stdin-reader", std::io::stdin())?;
        Ok(Self::new(BufReader::new(stream)))
    }
}

/// Pump a blocking reader into an async stream from a plain thread.
///
/// The stream ends when the reader hits end of input or fails. Must be called
/// from within a runtime.
pub(crate) fn spawn_reader<R>(name: &str, mut reader: R) -> std::io::Result<DuplexStream>
where
    R: Read + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(32);
    let (stream, mut writer) = tokio::io::duplex(READ_CHUNK_SIZE);

    let thread_name = name.to_string();
    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let mut buffer = vec![0u8; READ_CHUNK_SIZE];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        warn!(reader = %thread_name, error = %e, "Input read failed");
                        break;
                    }
                }
            }
            debug!(reader = %thread_name, "Input reader finished");
        })?;

    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if writer.write_all(&chunk).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    Ok(stream)
}

impl<R: AsyncBufRead + Unpin + Send> MessageSource for LineSource<R> {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, SourceError> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            return parse_line(&line).map(Some);
        }
        Ok(None)
    }

    async fn acknowledge(&mut self, id: &str, ack: Acknowledgment) {
        match ack {
            Acknowledgment::Completed => info!(id, "Delivery completed"),
            Acknowledgment::Rejected { reason } => warn!(id, %reason, "Delivery rejected"),
        }
    }
}

/// Writes forwarded messages as envelopes, one per line.
#[derive(Debug)]
pub struct LineSink<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl LineSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> MessageSink for LineSink<W> {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
        let mut line = render_line(&message)?;
        line.push('\n');

        // One lock per line keeps concurrent writes from interleaving
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_text_payload() {
        let message =
            parse_line(r#"{"id":"d-1","payload":"[]","properties":{"camera":"north"}}"#).unwrap();
        assert_eq!(message.id, "d-1");
        assert_eq!(&message.payload[..], b"[]");
        assert_eq!(message.properties.get("camera").map(String::as_str), Some("north"));
    }

    #[test]
    fn test_parse_binary_payload() {
        let message = parse_line(r#"{"id":"d-2","payload_b64":"//4A"}"#).unwrap();
        assert_eq!(&message.payload[..], &[0xFF, 0xFE, 0x00]);
        assert!(message.properties.is_empty());
    }

    #[test]
    fn test_parse_without_payload() {
        let message = parse_line(r#"{"id":"d-3"}"#).unwrap();
        assert!(message.is_empty());
    }

    #[rstest]
    #[case::not_json("hello")]
    #[case::missing_id(r#"{"payload":"x"}"#)]
    #[case::bad_base64(r#"{"id":"x","payload_b64":"***"}"#)]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(matches!(parse_line(line), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn test_render_binary_payload_as_base64() {
        let inbound = InboundMessage::new("x", vec![0xFF, 0xFE, 0x00]);
        let outbound = OutboundMessage::relay_of(&inbound);

        let envelope: Envelope = serde_json::from_str(&render_line(&outbound).unwrap()).unwrap();
        assert_eq!(envelope.id, outbound.id.to_string());
        assert_eq!(envelope.payload, None);
        assert_eq!(envelope.payload_b64.as_deref(), Some("//4A"));
    }

    #[tokio::test]
    async fn test_line_source_skips_blank_lines() {
        let input = "\n{\"id\":\"a\",\"payload\":\"null\"}\n  \nnot json\n";
        let mut source = LineSource::new(BufReader::new(input.as_bytes()));

        let first = source.next_message().await.unwrap().unwrap();
        assert_eq!(first.id, "a");
        assert!(matches!(
            source.next_message().await,
            Err(SourceError::Malformed(_))
        ));
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_thread_feeds_lines() {
        let input = "{\"id\":\"a\",\"payload\":\"[]\"}\n{\"id\":\"b\"}\n";
        let stream = spawn_reader("test-reader", std::io::Cursor::new(input.as_bytes().to_vec()))
            .unwrap();
        let mut source = LineSource::new(BufReader::new(stream));

        assert_eq!(source.next_message().await.unwrap().unwrap().id, "a");
        assert_eq!(source.next_message().await.unwrap().unwrap().id, "b");
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_line_sink_writes_one_line_per_message() {
        let sink = LineSink::new(Vec::new());
        let inbound = InboundMessage::new("a", "[]").with_property("zone", "gate");

        sink.send(OutboundMessage::relay_of(&inbound)).await.unwrap();
        sink.send(OutboundMessage::relay_of(&inbound)).await.unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let message = parse_line(lines[0]).unwrap();
        assert_eq!(&message.payload[..], b"[]");
        assert_eq!(message.properties, inbound.properties);
    }
}
