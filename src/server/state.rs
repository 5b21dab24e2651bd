//! # Application State
//!
//! Shared state passed to all HTTP handlers. Adapters are cheap and built per
//! request, so only the configuration and the pooled upstream client live here.

use crate::{
    config::Config,
    core::http_client::{HttpClientBuilder, HttpClientError},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Pooled client shared by every upstream call
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Create new application state from configuration
    pub fn new(config: Config) -> Result<Self, HttpClientError> {
        let http_client = HttpClientBuilder::from_config(&config).build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}
