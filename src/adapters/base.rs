//! # Base Adapter Functionality
//!
//! Common functionality and traits shared by the provider adapters. Both
//! providers speak the OpenAI chat-completions dialect over SSE, so everything
//! except usage extraction lives here.

use crate::{
    error::ProxyError,
    schemas::{ChatCompletionChunk, ChatCompletionRequest, UpstreamErrorBody, Usage},
};
use reqwest::{Client, Response};
use tracing::debug;

/// Base adapter trait that both provider adapters implement
#[async_trait::async_trait]
pub trait AdapterTrait: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &'static str;

    fn base_url(&self) -> &str;

    /// Whether a credential is configured
    fn has_auth(&self) -> bool;

    /// Usage carried by this chunk, wherever the provider puts it.
    fn usage_from_chunk(&self, chunk: &ChatCompletionChunk) -> Option<Usage>;

    /// Open the upstream streaming call. Resolves once response headers have
    /// arrived; a non-2xx status is returned as `ProxyError::Upstream`.
    async fn open_upstream(&self, request: &ChatCompletionRequest) -> Result<Response, ProxyError>;
}

/// Utility functions for adapters
pub struct AdapterUtils;

impl AdapterUtils {
    /// POST a streaming chat completion to `<base>/chat/completions`.
    pub async fn post_streaming(
        adapter_name: &str,
        client: &Client,
        base: &str,
        token: Option<&str>,
        request: &ChatCompletionRequest,
    ) -> Result<Response, ProxyError> {
        let url = Self::completions_url(base);
        Self::log_request(adapter_name, &request.model, request.messages.len());

        let start_time = std::time::Instant::now();
        let mut request_builder = client
            .post(url)
            .header("Accept", "text/event-stream")
            .json(request);

        if let Some(token) = token {
            request_builder = request_builder.bearer_auth(token);
        }

        let resp = request_builder.send().await.map_err(|e| {
            debug!("{} request failed: {}", adapter_name, e);
            ProxyError::from(e)
        })?;

        let status = resp.status();
        let response_time = start_time.elapsed().as_millis() as u64;
        Self::log_response(adapter_name, &request.model, status.is_success(), response_time);

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!("{} error response: {}", adapter_name, body);
            return Err(ProxyError::Upstream(Self::describe_error(status.as_u16(), &body)));
        }

        Ok(resp)
    }

    /// Human-readable message for a non-2xx upstream response, preferring the
    /// provider's own `error.message`.
    pub fn describe_error(status: u16, body: &str) -> String {
        match serde_json::from_str::<UpstreamErrorBody>(body) {
            Ok(parsed) => format!("{} {}", status, parsed.error.message),
            Err(_) if body.trim().is_empty() => format!("{} status code (no body)", status),
            Err(_) => format!("{} {}", status, body.trim()),
        }
    }

    pub fn completions_url(base: &str) -> String {
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// Log adapter request for debugging
    pub fn log_request(adapter_name: &str, model: &str, message_count: usize) {
        debug!(
            adapter = adapter_name,
            model = model,
            message_count = message_count,
            "Opening upstream completion stream"
        );
    }

    /// Log adapter response for debugging
    pub fn log_response(adapter_name: &str, model: &str, success: bool, response_time_ms: u64) {
        debug!(
            adapter = adapter_name,
            model = model,
            success = success,
            response_time_ms = response_time_ms,
            "Upstream responded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            AdapterUtils::completions_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            AdapterUtils::completions_url("http://127.0.0.1:9000/"),
            "http://127.0.0.1:9000/chat/completions"
        );
    }

    #[test]
    fn test_describe_error() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(AdapterUtils::describe_error(401, body), "401 Incorrect API key provided");
        assert_eq!(AdapterUtils::describe_error(503, ""), "503 status code (no body)");
        assert_eq!(AdapterUtils::describe_error(500, "oops\n"), "500 oops");
    }
}
