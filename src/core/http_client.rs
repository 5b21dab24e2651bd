//! # HTTP Client Factory
//!
//! Centralized creation of the pooled reqwest clients used for upstream
//! provider calls and by the playground consumer.
//!
//! Streaming clients carry no total timeout by default: a completion may run
//! for minutes, and only connection setup is bounded.

use crate::config::Config;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors from assembling an upstream client
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Failed to build HTTP client: {0}")]
    BuildError(#[from] reqwest::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Idle-connection pooling for provider hosts
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub keepalive: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            keepalive: Some(Duration::from_secs(60)),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request limit, including reading the streamed body
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub pool: PoolConfig,
    pub compression: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            pool: PoolConfig::default(),
            // Compressed event streams would be buffered by the decoder
            compression: false,
        }
    }
}

impl From<&Config> for HttpClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.http_client_timeout.map(Duration::from_secs),
            connect_timeout: Duration::from_secs(config.http_connect_timeout),
            pool: PoolConfig {
                max_idle_per_host: config.http_client_max_connections_per_host,
                idle_timeout: Duration::from_secs(120),
                keepalive: Some(Duration::from_secs(60)),
            },
            compression: false,
        }
    }
}

/// Builds the reqwest clients shared by adapters and the relay client
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Defaults: no total timeout, 10s connect, no compression
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Seed from the `HTTP_*` settings in [`Config`]
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: HttpClientConfig::from(config),
        }
    }

    /// Set a total request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn pool_config(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// Enable or disable compression
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Fails on a zero connect timeout or a TLS backend error
    pub fn build(self) -> Result<Client, HttpClientError> {
        if self.config.connect_timeout.is_zero() {
            return Err(HttpClientError::InvalidConfig("connect timeout must be non-zero".to_string()));
        }

        let mut builder = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .pool_max_idle_per_host(self.config.pool.max_idle_per_host)
            .pool_idle_timeout(self.config.pool.idle_timeout);

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(keepalive) = self.config.pool.keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        // gzip/brotli are compiled in, so they must be switched off explicitly
        builder = builder
            .gzip(self.config.compression)
            .brotli(self.config.compression);

        builder.build().map_err(HttpClientError::from)
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
