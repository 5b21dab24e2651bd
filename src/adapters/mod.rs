//! # Provider Adapters Module
//!
//! One adapter per upstream provider family. Each opens a streaming chat
//! completion and exposes it as a lazy sequence of [`StreamEvent`]s, hiding
//! where the provider puts its usage accounting.
//!
//! ## Supported Providers:
//!
//! - **Groq**: OpenAI-compatible endpoint, usage in `x_groq.usage`
//! - **OpenAI**: usage on a trailing chunk's `usage` field
//!
//! [`StreamEvent`]: crate::streaming::StreamEvent

use crate::{
    config::Config,
    error::ProxyError,
    models::Provider,
    schemas::{ChatCompletionChunk, ChatCompletionRequest, CompletionRequest, Usage},
    streaming::{adapters::upstream_events, EventStream},
};
use reqwest::{Client, Response};

// Base adapter functionality
pub mod base;

pub mod groq;
pub mod openai;

pub use base::{AdapterTrait, AdapterUtils};
pub use groq::GroqAdapter;
pub use openai::OpenAIAdapter;

/// # Provider Adapter Enum
///
/// Selected per request by [`Provider::for_model`].
#[derive(Clone, Debug)]
pub enum Adapter {
    Groq(GroqAdapter),
    OpenAI(OpenAIAdapter),
}

impl Adapter {
    /// Build the adapter for `model`'s provider family.
    ///
    /// Only the routed provider's credential is checked; a missing key for the
    /// other family is irrelevant to this request.
    pub fn for_model(model: &str, cfg: &Config, client: Client) -> Result<Self, ProxyError> {
        let provider = Provider::for_model(model);
        let token = cfg.credential(provider).map(str::to_string);

        let adapter = match provider {
            Provider::Groq => Self::Groq(GroqAdapter::new(cfg.groq_base_url.clone(), token, client)),
            Provider::OpenAI => Self::OpenAI(OpenAIAdapter::new(cfg.openai_base_url.clone(), token, client)),
        };

        if !adapter.has_auth() {
            return Err(ProxyError::MissingCredential(provider.credential_env().to_string()));
        }

        Ok(adapter)
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Groq(_) => Provider::Groq,
            Self::OpenAI(_) => Provider::OpenAI,
        }
    }

    /// Open the upstream stream for `request`.
    ///
    /// Nothing happens on the network until the returned stream is first
    /// polled. Upstream errors surface as a single `Failure` event.
    pub fn open_stream(&self, request: &CompletionRequest) -> EventStream {
        upstream_events(self.clone(), request.to_upstream())
    }
}

#[async_trait::async_trait]
impl AdapterTrait for Adapter {
    fn name(&self) -> &'static str {
        match self {
            Self::Groq(adapter) => adapter.name(),
            Self::OpenAI(adapter) => adapter.name(),
        }
    }

    fn base_url(&self) -> &str {
        match self {
            Self::Groq(adapter) => adapter.base_url(),
            Self::OpenAI(adapter) => adapter.base_url(),
        }
    }

    fn has_auth(&self) -> bool {
        match self {
            Self::Groq(adapter) => adapter.has_auth(),
            Self::OpenAI(adapter) => adapter.has_auth(),
        }
    }

    fn usage_from_chunk(&self, chunk: &ChatCompletionChunk) -> Option<Usage> {
        match self {
            Self::Groq(adapter) => adapter.usage_from_chunk(chunk),
            Self::OpenAI(adapter) => adapter.usage_from_chunk(chunk),
        }
    }

    async fn open_upstream(&self, request: &ChatCompletionRequest) -> Result<Response, ProxyError> {
        match self {
            Self::Groq(adapter) => adapter.open_upstream(request).await,
            Self::OpenAI(adapter) => adapter.open_upstream(request).await,
        }
    }
}
