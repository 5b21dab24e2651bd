//! # Core Streaming Functionality
//!
//! The normalized event type every provider adapter produces, and the record
//! framing shared by the relay encoder and the client decoder.

use crate::schemas::{RelayPayload, TokenUsage};
use bytes::Bytes;
use futures_util::stream::BoxStream;

/// Field prefix of every relay record.
pub const DATA_PREFIX: &str = "data: ";

/// Record delimiter.
pub const RECORD_DELIMITER: &str = "\n\n";

/// # Stream Event
///
/// Normalized output of a provider adapter. Zero or more `ContentDelta`s are
/// followed by exactly one `Completion` or `Failure`; nothing follows those.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ContentDelta(String),
    Completion(Option<TokenUsage>),
    Failure(String),
}

impl StreamEvent {
    /// Returns true for `Completion` and `Failure`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completion(_) | Self::Failure(_))
    }

    /// Wire payload for this event.
    pub fn to_payload(&self) -> RelayPayload {
        match self {
            Self::ContentDelta(text) => RelayPayload {
                content: Some(text.clone()),
                ..Default::default()
            },
            Self::Completion(usage) => RelayPayload {
                done: true,
                usage: *usage,
                ..Default::default()
            },
            Self::Failure(message) => RelayPayload {
                error: Some(message.clone()),
                ..Default::default()
            },
        }
    }

    /// Interpret a decoded payload as a single event, preferring error, then
    /// done, then content. A payload may carry text alongside a terminal;
    /// callers that need both take `content` out first.
    pub fn from_payload(payload: RelayPayload) -> Option<Self> {
        if let Some(message) = payload.error {
            Some(Self::Failure(message))
        } else if payload.done {
            Some(Self::Completion(payload.usage))
        } else {
            payload.content.filter(|c| !c.is_empty()).map(Self::ContentDelta)
        }
    }
}

/// Lazy, single-pass sequence of events from one upstream call.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Frame one payload as `data: <json>\n\n`.
pub fn encode_payload(payload: &RelayPayload) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    let mut record = String::with_capacity(DATA_PREFIX.len() + json.len() + RECORD_DELIMITER.len());
    record.push_str(DATA_PREFIX);
    record.push_str(&json);
    record.push_str(RECORD_DELIMITER);
    Ok(Bytes::from(record))
}

/// Create a content record
pub fn create_content_record(content: &str) -> Result<Bytes, serde_json::Error> {
    encode_payload(&StreamEvent::ContentDelta(content.to_string()).to_payload())
}

/// Create the `done` record that ends a successful stream
pub fn create_done_record(usage: Option<TokenUsage>) -> Result<Bytes, serde_json::Error> {
    encode_payload(&StreamEvent::Completion(usage).to_payload())
}

/// Create an error record.
///
/// Falls back to a hand-built record so a failure can always be reported,
/// even when serialization is what failed.
pub fn create_error_record(message: &str) -> Bytes {
    encode_payload(&StreamEvent::Failure(message.to_string()).to_payload())
        .unwrap_or_else(|_| Bytes::from_static(b"data: {\"error\":\"Stream processing failed\"}\n\n"))
}

/// Encode an event as one record.
pub fn encode_event(event: &StreamEvent) -> Result<Bytes, serde_json::Error> {
    encode_payload(&event.to_payload())
}

/// Streaming metrics for one relay session, logged when the session closes.
#[derive(Debug, Clone, Default)]
pub struct StreamingMetrics {
    pub total_chunks: usize,
    pub total_bytes: usize,
    pub stream_duration_ms: u64,
    pub errors: usize,
}

impl StreamingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a content record being written
    pub fn record_chunk(&mut self, content_length: usize) {
        self.total_chunks += 1;
        self.total_bytes += content_length;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn set_duration(&mut self, duration_ms: u64) {
        self.stream_duration_ms = duration_ms;
    }
}
