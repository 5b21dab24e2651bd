//! # Groq Adapter Module
//!
//! Streaming adapter for Groq's OpenAI-compatible endpoint. Groq reports usage
//! in the `x_groq` side-channel object attached to the final chunk rather than
//! on a dedicated trailing chunk.

use crate::{
    adapters::base::{AdapterTrait, AdapterUtils},
    error::ProxyError,
    schemas::{ChatCompletionChunk, ChatCompletionRequest, Usage},
};
use reqwest::{Client, Response};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// # Groq Adapter
#[derive(Clone, Debug)]
pub struct GroqAdapter {
    base: String,
    client: Client,
    token: Option<String>,
}

impl GroqAdapter {
    pub fn new(base: String, token: Option<String>, client: Client) -> Self {
        Self { base, client, token }
    }
}

#[async_trait::async_trait]
impl AdapterTrait for GroqAdapter {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn base_url(&self) -> &str {
        &self.base
    }

    fn has_auth(&self) -> bool {
        self.token.is_some()
    }

    /// `x_groq.usage` wins; newer Groq deployments also honour
    /// `include_usage` and fill the top-level field.
    fn usage_from_chunk(&self, chunk: &ChatCompletionChunk) -> Option<Usage> {
        chunk
            .x_groq
            .as_ref()
            .and_then(|meta| meta.usage)
            .or(chunk.usage)
    }

    async fn open_upstream(&self, request: &ChatCompletionRequest) -> Result<Response, ProxyError> {
        AdapterUtils::post_streaming(self.name(), &self.client, &self.base, self.token.as_deref(), request).await
    }
}
