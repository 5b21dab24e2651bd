//! # Server Module
//!
//! Router, handlers and shared state for the relay HTTP server.

pub mod handlers;
pub mod state;

pub use handlers::{chat, health_check, list_models};
pub use state::AppState;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{self, TraceLayer},
};
use tracing::{warn, Level};

/// Create router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origin);

    Router::new()
        // Playground streaming endpoint
        .route("/api/chat", post(chat))
        .route("/api/models", get(list_models))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                // Event streams are excluded by the default predicate
                .layer(CompressionLayer::new())
                .layer(TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(trace::DefaultOnResponse::new().level(Level::INFO)))
                .layer(cors),
        )
        .with_state(state)
}

/// Permissive for `*`, otherwise the exact configured origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
        Err(_) => {
            warn!("Invalid CORS origin '{}', falling back to permissive CORS", origin);
            CorsLayer::permissive()
        }
    }
}
