//! # Client Stream Consumer
//!
//! Reads a relay response incrementally and applies each record to a
//! [`StreamObserver`]. Used by the playground session and the `ask` command.
//!
//! Records are reassembled at the byte level, so neither a record nor a
//! multi-byte character split across reads is lost. Malformed records are
//! logged and skipped. The first terminal record wins and the connection is
//! dropped as soon as it arrives.

use crate::{
    core::http_client::HttpClientBuilder,
    error::ProxyError,
    schemas::{CompletionRequest, ErrorResponse, RelayPayload, TokenUsage},
    streaming::{SseDecoder, StreamEvent},
};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::{fmt, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Receives decoded records for one stream.
pub trait StreamObserver {
    fn on_content(&mut self, text: &str);
    fn on_done(&mut self, usage: Option<TokenUsage>);
    fn on_error(&mut self, message: String);
}

/// Discards everything.
impl StreamObserver for () {
    fn on_content(&mut self, _text: &str) {}
    fn on_done(&mut self, _usage: Option<TokenUsage>) {}
    fn on_error(&mut self, _message: String) {}
}

impl<O: StreamObserver + ?Sized> StreamObserver for &mut O {
    fn on_content(&mut self, text: &str) {
        (**self).on_content(text)
    }

    fn on_done(&mut self, usage: Option<TokenUsage>) {
        (**self).on_done(usage)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }
}

/// Forwards every record to both observers, left first.
pub struct Tee<A, B>(pub A, pub B);

impl<A: StreamObserver, B: StreamObserver> StreamObserver for Tee<A, B> {
    fn on_content(&mut self, text: &str) {
        self.0.on_content(text);
        self.1.on_content(text);
    }

    fn on_done(&mut self, usage: Option<TokenUsage>) {
        self.0.on_done(usage);
        self.1.on_done(usage);
    }

    fn on_error(&mut self, message: String) {
        self.0.on_error(message.clone());
        self.1.on_error(message);
    }
}

/// # Stream Session
///
/// Accumulated state of one response panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSession {
    pub model: String,
    pub response: String,
    pub usage: Option<TokenUsage>,
    pub error: Option<String>,
    pub is_streaming: bool,
    pub response_time: Option<Duration>,
}

impl StreamSession {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Reset for a new run against `model` and mark it streaming.
    pub fn begin(&mut self, model: impl Into<String>) {
        *self = Self {
            model: model.into(),
            is_streaming: true,
            ..Default::default()
        };
    }

    /// Clear the response, error, usage and timing; keep the model.
    pub fn clear(&mut self) {
        self.response.clear();
        self.error = None;
        self.usage = None;
        self.response_time = None;
    }
}

impl StreamObserver for StreamSession {
    fn on_content(&mut self, text: &str) {
        self.response.push_str(text);
    }

    fn on_done(&mut self, usage: Option<TokenUsage>) {
        if usage.is_some() {
            self.usage = usage;
        }
        self.is_streaming = false;
    }

    fn on_error(&mut self, message: String) {
        self.error = Some(message);
        self.is_streaming = false;
    }
}

/// # Cancel Handle
///
/// Aborts an in-flight read and its connection. Cancelling twice, or after the
/// stream has already ended, does nothing.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// How one consumed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// `done` record received
    Completed,
    /// `error` record, non-2xx response or transport failure
    Failed,
    /// Cancelled by the caller; not an error
    Cancelled,
    /// Connection closed without a terminal record
    Closed,
}

/// Decode `body` into `observer` until a terminal record, cancellation or EOF.
pub async fn consume_stream<S, E, O>(body: S, observer: &mut O, cancel: &CancelHandle) -> ConsumeOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
    O: StreamObserver + ?Sized,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Stream cancelled by caller");
                return ConsumeOutcome::Cancelled;
            }
            chunk = body.next() => chunk,
        };

        let records = match chunk {
            Some(Ok(bytes)) => decoder.push(&bytes),
            Some(Err(e)) => {
                observer.on_error(format!("Stream read failed: {}", e));
                return ConsumeOutcome::Failed;
            }
            None => {
                let records = decoder.finish();
                return apply_records(&records, observer).unwrap_or(ConsumeOutcome::Closed);
            }
        };

        if let Some(outcome) = apply_records(&records, observer) {
            return outcome;
        }
    }
}

/// Apply decoded records in order; returns the outcome of the first terminal.
fn apply_records<O: StreamObserver + ?Sized>(records: &[String], observer: &mut O) -> Option<ConsumeOutcome> {
    for data in records {
        let mut payload: RelayPayload = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping malformed stream record {:?}: {}", data, e);
                continue;
            }
        };

        // Text riding on a terminal record still belongs to the response
        if let Some(text) = payload.content.take().filter(|c| !c.is_empty()) {
            observer.on_content(&text);
        }

        match StreamEvent::from_payload(payload) {
            Some(StreamEvent::Completion(usage)) => {
                observer.on_done(usage);
                return Some(ConsumeOutcome::Completed);
            }
            Some(StreamEvent::Failure(message)) => {
                observer.on_error(message);
                return Some(ConsumeOutcome::Failed);
            }
            Some(StreamEvent::ContentDelta(_)) | None => {}
        }
    }
    None
}

/// # Relay Client
///
/// Posts playground requests to a running relay and consumes the streamed
/// response.
#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    /// Create a client for the relay at `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProxyError> {
        let client = HttpClientBuilder::new()
            .build()
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `request` to `/api/chat`.
    ///
    /// A non-2xx response becomes an error carrying the body's `error` field,
    /// or `HTTP error <status>` when there is none.
    pub async fn open(&self, request: &CompletionRequest) -> Result<reqwest::Response, ProxyError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .map(|body| body.error)
            .filter(|error| !error.is_empty())
            .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));
        Err(ProxyError::Upstream(message))
    }

    /// Run `request` to completion, feeding `observer`.
    ///
    /// Errors opening the stream are reported through `observer.on_error`.
    /// Cancellation is honoured while connecting as well as while reading.
    pub async fn stream<O>(&self, request: &CompletionRequest, observer: &mut O, cancel: &CancelHandle) -> ConsumeOutcome
    where
        O: StreamObserver + ?Sized,
    {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ConsumeOutcome::Cancelled,
            opened = self.open(request) => opened,
        };

        match opened {
            Ok(response) => consume_stream(response.bytes_stream(), observer, cancel).await,
            Err(e) => {
                debug!(model = %request.model, "Relay request failed: {}", e);
                observer.on_error(e.to_string());
                ConsumeOutcome::Failed
            }
        }
    }
}
