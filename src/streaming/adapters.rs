//! # Upstream Event Streams
//!
//! Turns one upstream SSE response into the normalized [`StreamEvent`]
//! sequence. The same reader serves every provider; the adapter only decides
//! where usage lives in a chunk.

use crate::{
    adapters::AdapterTrait,
    schemas::{ChatCompletionChunk, ChatCompletionRequest, Usage},
    streaming::{core::EventStream, sse::SseDecoder, StreamEvent},
};
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use tracing::{debug, error};

/// Sentinel ending an OpenAI-dialect stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Open a lazy event stream over `adapter`.
///
/// The upstream request is sent on first poll. Dropping the stream drops the
/// response body, which closes the upstream connection.
pub fn upstream_events<A>(adapter: A, request: ChatCompletionRequest) -> EventStream
where
    A: AdapterTrait + 'static,
{
    let reader = UpstreamReader::new(adapter, request);
    stream::unfold(reader, |mut reader| async move {
        let event = reader.next_event().await?;
        Some((event, reader))
    })
    .boxed()
}

struct UpstreamReader<A> {
    adapter: A,
    /// Taken on first poll
    request: Option<ChatCompletionRequest>,
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    decoder: SseDecoder,
    queued: VecDeque<StreamEvent>,
    /// Most recent usage seen anywhere in the stream
    usage: Option<Usage>,
    finished: bool,
}

impl<A: AdapterTrait> UpstreamReader<A> {
    fn new(adapter: A, request: ChatCompletionRequest) -> Self {
        Self {
            adapter,
            request: Some(request),
            body: None,
            decoder: SseDecoder::new(),
            queued: VecDeque::new(),
            usage: None,
            finished: false,
        }
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                if event.is_terminal() {
                    self.finish();
                }
                return Some(event);
            }
            if self.finished {
                return None;
            }

            if let Some(request) = self.request.take() {
                match self.adapter.open_upstream(&request).await {
                    Ok(response) => self.body = Some(response.bytes_stream().boxed()),
                    Err(e) => {
                        error!(adapter = self.adapter.name(), "Upstream request failed: {}", e);
                        return Some(self.fail(e.to_string()));
                    }
                }
                continue;
            }

            let Some(body) = self.body.as_mut() else {
                return Some(self.complete());
            };

            match body.next().await {
                Some(Ok(bytes)) => {
                    for data in self.decoder.push(&bytes) {
                        self.handle_data(&data);
                    }
                }
                Some(Err(e)) => {
                    error!(adapter = self.adapter.name(), "Upstream stream aborted: {}", e);
                    return Some(self.fail(format!("Upstream stream aborted: {}", e)));
                }
                None => {
                    for data in self.decoder.finish() {
                        self.handle_data(&data);
                    }
                    self.body = None;
                }
            }
        }
    }

    /// Apply one upstream record. Anything queued after a terminal event is
    /// discarded by `next_event`.
    fn handle_data(&mut self, data: &str) {
        if self.queued.back().is_some_and(StreamEvent::is_terminal) {
            return;
        }

        if data.trim() == DONE_SENTINEL {
            // Natural end; stop reading so the connection is released now
            self.body = None;
            let completion = self.completion();
            self.queued.push_back(completion);
            return;
        }

        let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.queued
                    .push_back(StreamEvent::Failure(format!("Could not parse upstream chunk: {}", e)));
                return;
            }
        };

        if let Some(err) = chunk.error.as_ref() {
            self.queued.push_back(StreamEvent::Failure(err.message.clone()));
            return;
        }

        if let Some(content) = chunk.content() {
            self.queued.push_back(StreamEvent::ContentDelta(content.to_string()));
        }
        if let Some(usage) = self.adapter.usage_from_chunk(&chunk) {
            self.usage = Some(usage);
        }
    }

    fn completion(&self) -> StreamEvent {
        StreamEvent::Completion(self.usage.map(Into::into))
    }

    fn complete(&mut self) -> StreamEvent {
        debug!(adapter = self.adapter.name(), has_usage = self.usage.is_some(), "Upstream stream exhausted");
        self.finish();
        self.completion()
    }

    fn fail(&mut self, message: String) -> StreamEvent {
        self.finish();
        StreamEvent::Failure(message)
    }

    fn finish(&mut self) {
        self.finished = true;
        self.body = None;
        self.queued.clear();
    }
}
