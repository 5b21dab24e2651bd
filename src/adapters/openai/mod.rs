//! # OpenAI Adapter Module
//!
//! Streaming adapter for the OpenAI chat completions API. With
//! `stream_options.include_usage` set, OpenAI sends usage on a trailing chunk
//! with an empty `choices` array and a top-level `usage` field.

use crate::{
    adapters::base::{AdapterTrait, AdapterUtils},
    error::ProxyError,
    schemas::{ChatCompletionChunk, ChatCompletionRequest, Usage},
};
use reqwest::{Client, Response};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// # OpenAI Adapter
#[derive(Clone, Debug)]
pub struct OpenAIAdapter {
    /// Base URL (e.g., "https://api.openai.com/v1")
    base: String,
    /// Shared, pooled HTTP client
    client: Client,
    token: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(base: String, token: Option<String>, client: Client) -> Self {
        Self { base, client, token }
    }
}

#[async_trait::async_trait]
impl AdapterTrait for OpenAIAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn base_url(&self) -> &str {
        &self.base
    }

    fn has_auth(&self) -> bool {
        self.token.is_some()
    }

    fn usage_from_chunk(&self, chunk: &ChatCompletionChunk) -> Option<Usage> {
        chunk.usage
    }

    async fn open_upstream(&self, request: &ChatCompletionRequest) -> Result<Response, ProxyError> {
        AdapterUtils::post_streaming(self.name(), &self.client, &self.base, self.token.as_deref(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http_client::HttpClientBuilder;
    use serde_json::json;

    fn adapter(token: Option<&str>) -> OpenAIAdapter {
        let client = HttpClientBuilder::new().build().unwrap();
        OpenAIAdapter::new(DEFAULT_BASE_URL.to_string(), token.map(str::to_string), client)
    }

    #[test]
    fn test_openai_adapter_creation() {
        let adapter = adapter(Some("sk-test"));

        assert_eq!(adapter.name(), "openai");
        assert_eq!(adapter.base_url(), "https://api.openai.com/v1");
        assert!(adapter.has_auth());
    }

    #[test]
    fn test_openai_adapter_without_auth() {
        assert!(!adapter(None).has_auth());
    }

    #[test]
    fn test_usage_read_from_top_level_field() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": { "prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21 }
        }))
        .unwrap();
        assert_eq!(adapter(None).usage_from_chunk(&chunk).map(|u| u.total_tokens), Some(21));
    }

    #[test]
    fn test_groq_side_channel_ignored() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [],
            "x_groq": { "usage": { "prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2 } }
        }))
        .unwrap();
        assert!(adapter(None).usage_from_chunk(&chunk).is_none());
    }
}
