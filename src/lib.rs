//! # Playground Relay
//!
//! Streaming relay for an LLM playground. A browser-style client posts a
//! prompt; the relay routes it to Groq or OpenAI by model id, reads the
//! provider's SSE stream and re-emits it in one normalized record format:
//!
//! ```text
//! data: {"content":"Hel"}
//!
//! data: {"content":"lo"}
//!
//! data: {"done":true,"usage":{"promptTokens":5,"completionTokens":2,"totalTokens":7}}
//! ```
//!
//! The same crate carries the client side: an incremental consumer, a
//! side-by-side compare coordinator and the playground session state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use playground_relay::{create_router, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::for_test(); // or Config::parse_args() for CLI
//!     let app = create_router(AppState::new(config)?);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`adapters`] - Groq and OpenAI provider adapters
//! - [`streaming`] - event normalization, record framing, relay encoder
//! - [`server`] - axum router, handlers and state
//! - [`consumer`] - client-side stream decoding and relay client
//! - [`coordinator`] - single and compare runs
//! - [`playground`] - playground session state
//! - [`config`] - configuration with CLI and environment support
//! - [`error`] - error type and HTTP mapping

// Core infrastructure
pub mod core;
pub mod config;
pub mod error;
pub mod models;
pub mod schemas;
pub mod graceful_shutdown;

// Relay
pub mod adapters;
pub mod streaming;

#[cfg(feature = "server")]
pub mod server;

// Client side
pub mod consumer;
pub mod coordinator;
pub mod history;
pub mod playground;
pub mod stats;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::ProxyError;
pub use adapters::{Adapter, GroqAdapter, OpenAIAdapter};
pub use models::{ModelDescriptor, Provider};
pub use schemas::{CompletionRequest, RelayPayload, TokenUsage};
pub use streaming::{EventStream, StreamEvent};
pub use consumer::{consume_stream, CancelHandle, ConsumeOutcome, RelayClient, StreamObserver, StreamSession};
pub use coordinator::{run_compare, run_single};
pub use history::RecentPromptLog;
pub use playground::{Playground, RunOutcome, StopHandle};
pub use crate::core::http_client::{HttpClientBuilder, HttpClientConfig};
pub use graceful_shutdown::GracefulShutdown;

#[cfg(feature = "server")]
pub use server::{create_router, AppState};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ProxyError>;
