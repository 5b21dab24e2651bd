//! # Schemas Module
//!
//! Data structures crossing the wire in both directions:
//!
//! - the inbound playground request (`CompletionRequest`)
//! - the upstream OpenAI-dialect chat completion request and streaming chunks
//!   (both Groq and OpenAI speak this dialect)
//! - the relay's own three-message record payload (`RelayPayload`)

use crate::error::ProxyError;
use crate::models::{Provider, DEFAULT_MODEL_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// # Completion Request
///
/// One validated playground request. Built once by the dispatcher and never
/// mutated afterwards; serializes to the inbound JSON shape so the client
/// consumer can post it as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request for `model` with default sampling settings.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Attach a system prompt. Blank prompts are dropped.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = normalize_system_prompt(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Same request aimed at a different model (compare mode).
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// Provider family this request routes to.
    pub fn provider(&self) -> Provider {
        Provider::for_model(&self.model)
    }

    /// Validate a parsed inbound body.
    ///
    /// Missing optional fields take their documented defaults; a present field
    /// of the wrong type is rejected rather than silently replaced.
    pub fn from_json(body: &Value, default_model: &str) -> Result<Self, ProxyError> {
        let fields = body
            .as_object()
            .ok_or_else(|| ProxyError::BadRequest("Request body must be a JSON object".to_string()))?;

        let prompt = match fields.get("prompt") {
            Some(Value::String(prompt)) if !prompt.trim().is_empty() => prompt.clone(),
            _ => return Err(ProxyError::BadRequest("Prompt is required".to_string())),
        };

        // Non-string system prompts are ignored, not rejected.
        let system_prompt = match fields.get("systemPrompt") {
            Some(Value::String(system)) => normalize_system_prompt(system.clone()),
            _ => None,
        };

        let model = match fields.get("model") {
            None | Some(Value::Null) => default_model.to_string(),
            Some(Value::String(model)) if !model.trim().is_empty() => model.clone(),
            Some(_) => {
                return Err(ProxyError::BadRequest("Model must be a non-empty string".to_string()))
            }
        };

        let temperature = match fields.get("temperature") {
            None | Some(Value::Null) => DEFAULT_TEMPERATURE,
            Some(value) => value
                .as_f64()
                .map(|t| t as f32)
                .ok_or_else(|| ProxyError::BadRequest("Temperature must be a number".to_string()))?,
        };

        let max_tokens = match fields.get("maxTokens") {
            None | Some(Value::Null) => DEFAULT_MAX_TOKENS,
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    ProxyError::BadRequest("maxTokens must be a positive integer".to_string())
                })?,
        };

        Ok(Self {
            prompt,
            system_prompt,
            model,
            temperature,
            max_tokens,
        })
    }

    /// Validate raw body bytes, rejecting anything that is not JSON.
    pub fn from_slice(bytes: &[u8], default_model: &str) -> Result<Self, ProxyError> {
        let body: Value = serde_json::from_slice(bytes)
            .map_err(|e| ProxyError::BadRequest(format!("Invalid JSON body: {}", e)))?;
        Self::from_json(&body, default_model)
    }

    /// Build the upstream chat completion body for this request.
    pub fn to_upstream(&self) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(self.prompt.clone()));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
            stream_options: StreamOptions { include_usage: true },
        }
    }
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_MODEL_ID)
    }
}

fn normalize_system_prompt(system_prompt: String) -> Option<String> {
    if system_prompt.trim().is_empty() {
        None
    } else {
        Some(system_prompt)
    }
}

/// # Token Usage
///
/// Client-facing usage accounting. Values are passed through from upstream
/// without checking that the total adds up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Upstream (snake_case) usage block.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// # Chat Completion Request
///
/// OpenAI-dialect streaming request sent to either provider.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
    pub stream_options: StreamOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: "system".to_string(),
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// # Chat Completion Chunk
///
/// One upstream streaming chunk. Only the fields the relay reads are modelled;
/// everything else is ignored so provider additions never break decoding.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    /// OpenAI: usage on the trailing chunk when `include_usage` is set
    #[serde(default)]
    pub usage: Option<Usage>,
    /// Groq: side-channel metadata carrying usage on the final chunk
    #[serde(default)]
    pub x_groq: Option<GroqMetadata>,
    /// Mid-stream error object; ends the stream
    #[serde(default)]
    pub error: Option<UpstreamErrorDetails>,
}

impl ChatCompletionChunk {
    /// Text carried by the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroqMetadata {
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Error body returned by both providers on a non-2xx status.
#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: UpstreamErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamErrorDetails {
    pub message: String,
}

/// # Relay Payload
///
/// JSON body of one relay record. Exactly one of the three shapes is produced
/// by the encoder: `{content}`, `{done: true, usage?}` or `{error}`. The decoder
/// is lenient and accepts any combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Synchronous error body (`{"error": "..."}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
