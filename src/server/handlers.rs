//! # Server Handlers
//!
//! HTTP route handlers for the relay.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
};
use crate::{
    adapters::Adapter,
    error::ProxyError,
    models,
    schemas::CompletionRequest,
    streaming::create_streaming_response,
};
use super::AppState;
use tracing::{debug, warn};

/// `POST /api/chat`
///
/// Validation and credential errors are returned synchronously as JSON. Once
/// they pass, the response is an event stream and every later failure travels
/// inside it.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response, ProxyError> {
    let config = state.config();

    let request = CompletionRequest::from_slice(&body, &config.default_model).map_err(|e| {
        debug!("Rejected chat request: {}", e);
        e
    })?;

    let adapter = Adapter::for_model(&request.model, config, state.http_client().clone()).map_err(|e| {
        warn!(
            model = %request.model,
            upstream = %config.redacted_base_url(request.provider()),
            "Refusing chat request: {}",
            e
        );
        e
    })?;

    Ok(create_streaming_response(adapter, request, config.relay_channel_capacity))
}

/// `GET /api/models`
///
/// The catalog is display metadata; the configured default may name a model
/// outside it.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    JsonResponse(serde_json::json!({
        "models": models::all(),
        "defaultModel": state.config().default_model,
    }))
}

/// Health check handler
pub async fn health_check() -> impl IntoResponse {
    let health_status = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "playground-relay",
        "version": env!("CARGO_PKG_VERSION")
    });

    (StatusCode::OK, JsonResponse(health_status))
}
