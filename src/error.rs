#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde_json::json;
use thiserror::Error;

/// # Relay Error
///
/// Every failure the relay can surface. Validation and configuration errors are
/// returned synchronously before a stream is opened; the rest travel inside the
/// stream as `{"error": ...}` records once streaming has started.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound request is malformed or missing required fields
    #[error("{0}")]
    BadRequest(String),
    /// The credential for the routed provider is absent (holds the env var name)
    #[error("{0} not configured")]
    MissingCredential(String),
    /// The upstream provider rejected or aborted the call
    #[error("{0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Status code used for the synchronous (non-streaming) response.
    #[cfg(feature = "server")]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

/// # From Trait Implementations
///
/// reqwest failures are the only foreign errors the relay client lifts with `?`.
impl From<reqwest::Error> for ProxyError {
    /// Classify reqwest failures by what went wrong on the wire.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Upstream("Request timeout - upstream service did not respond in time".to_string())
        } else if err.is_connect() {
            ProxyError::Upstream(format!("Connection failed - unable to reach upstream service: {}", err))
        } else if err.is_builder() {
            ProxyError::Internal(format!("Invalid upstream request: {}", err))
        } else if let Some(status) = err.status() {
            ProxyError::Upstream(format!("HTTP {}: {}", status.as_u16(), err))
        } else {
            ProxyError::Upstream(format!("HTTP client error: {}", err))
        }
    }
}
