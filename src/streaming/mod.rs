//! # Streaming Module
//!
//! Server-Sent Events plumbing shared by the relay server and the playground
//! client:
//!
//! - [`core`]: the normalized [`StreamEvent`] and `data: <json>\n\n` framing
//! - [`sse`]: incremental record decoder (byte-level partial buffering)
//! - [`adapters`]: upstream SSE response to [`EventStream`]
//! - [`relay`]: [`EventStream`] into the bounded outgoing channel

pub mod adapters;
pub mod core;
pub mod relay;
pub mod sse;

pub use self::core::{
    create_content_record, create_done_record, create_error_record, encode_event, encode_payload, EventStream,
    StreamEvent, StreamingMetrics,
};
pub use relay::{relay_events, spawn_relay, RecordSender, RelayOutcome, RELAY_FAILURE_MESSAGE};
pub use sse::SseDecoder;

#[cfg(feature = "server")]
use crate::{adapters::Adapter, schemas::CompletionRequest};
#[cfg(feature = "server")]
use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

/// Start relaying `request` through `adapter` and return the open response.
///
/// The relay runs on its own task; the response body is returned before the
/// upstream call is even made.
#[cfg(feature = "server")]
pub fn create_streaming_response(adapter: Adapter, request: CompletionRequest, capacity: usize) -> Response {
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;
    use tracing::info;

    let (tx, rx) = mpsc::channel(capacity.max(1));
    let request_id = uuid::Uuid::new_v4().to_string();

    info!(
        request_id = %request_id,
        provider = %adapter.provider(),
        model = %request.model,
        "Opening relay stream"
    );

    spawn_relay(adapter.open_stream(&request), tx, request_id);

    let mut response = Body::from_stream(ReceiverStream::new(rx)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
