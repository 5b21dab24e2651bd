#[cfg(feature = "cli")]
use clap::Parser;
use url::Url;

use crate::adapters::{groq, openai};
use crate::models::{Provider, DEFAULT_MODEL_ID};

/// # Playground Relay Configuration
///
/// Server configuration loaded from command-line arguments, environment
/// variables and an optional `.env` file.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "playground-relay"))]
#[cfg_attr(feature = "cli", command(about = "Streaming relay between the LLM playground and Groq/OpenAI"))]
pub struct Config {
    // =============================================================================
    // CORE SERVER CONFIGURATION
    // =============================================================================

    /// Server port to listen on
    #[cfg_attr(feature = "cli", arg(short, long, env = "PORT", default_value = "3000"))]
    pub port: u16,

    /// Server host to bind to
    #[cfg_attr(feature = "cli", arg(long, env = "HOST", default_value = "0.0.0.0"))]
    pub host: String,

    // =============================================================================
    // PROVIDER CONFIGURATION
    // =============================================================================

    /// Groq API key (models not starting with `gpt-`)
    #[cfg_attr(feature = "cli", arg(long, env = "GROQ_API_KEY", hide_env_values = true))]
    pub groq_api_key: Option<String>,

    /// OpenAI API key (models starting with `gpt-`)
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_API_KEY", hide_env_values = true))]
    pub openai_api_key: Option<String>,

    /// Groq OpenAI-compatible base URL
    #[cfg_attr(feature = "cli", arg(long, env = "GROQ_BASE_URL", default_value = groq::DEFAULT_BASE_URL))]
    pub groq_base_url: String,

    /// OpenAI base URL
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_BASE_URL", default_value = openai::DEFAULT_BASE_URL))]
    pub openai_base_url: String,

    /// Model used when a request names none
    #[cfg_attr(feature = "cli", arg(long, env = "DEFAULT_MODEL", default_value = DEFAULT_MODEL_ID))]
    pub default_model: String,

    // =============================================================================
    // PERFORMANCE AND STREAMING
    // =============================================================================

    /// Total upstream request timeout in seconds (unset: no limit)
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CLIENT_TIMEOUT"))]
    pub http_client_timeout: Option<u64>,

    /// Upstream connect timeout in seconds
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10"))]
    pub http_connect_timeout: u64,

    /// Maximum idle connections kept per upstream host
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CLIENT_MAX_CONNECTIONS_PER_HOST", default_value = "10"))]
    pub http_client_max_connections_per_host: usize,

    /// Records buffered between the relay task and the client connection
    #[cfg_attr(feature = "cli", arg(long, env = "RELAY_CHANNEL_CAPACITY", default_value = "16"))]
    pub relay_channel_capacity: usize,

    // =============================================================================
    // LOGGING AND SECURITY
    // =============================================================================

    /// Log filter (error, warn, info, debug, trace or an EnvFilter directive)
    #[cfg_attr(feature = "cli", arg(long, env = "RUST_LOG", default_value = "info"))]
    pub log_level: String,

    /// Environment (development, staging, production)
    #[cfg_attr(feature = "cli", arg(long, env = "ENVIRONMENT", default_value = "development"))]
    pub environment: String,

    /// CORS origin (use * for development only)
    #[cfg_attr(feature = "cli", arg(long, env = "CORS_ORIGIN", default_value = "*"))]
    pub cors_origin: String,
}

impl Config {
    /// Parse configuration from command line arguments and environment variables.
    ///
    /// Loads `.env` if present, parses, sets up logging and validates. Exits
    /// the process on invalid configuration.
    #[cfg(feature = "cli")]
    pub fn parse_args() -> Self {
        let _ = dotenv::dotenv();

        let config = Self::parse();
        config.init();
        config
    }

    /// Set up logging and validate an already-parsed configuration.
    #[cfg(feature = "cli")]
    pub fn init(&self) {
        self.setup_logging();

        if let Err(err) = self.validate() {
            eprintln!("Configuration validation failed: {}", err);
            std::process::exit(1);
        }
    }

    /// Create a test configuration with minimal required fields.
    /// Credentials are unset; tests opt in to the ones they need.
    pub fn for_test() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            groq_api_key: None,
            openai_api_key: None,
            groq_base_url: groq::DEFAULT_BASE_URL.to_string(),
            openai_base_url: openai::DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL_ID.to_string(),
            http_client_timeout: None,
            http_connect_timeout: 10,
            http_client_max_connections_per_host: 10,
            relay_channel_capacity: 16,
            log_level: "info".to_string(),
            environment: "development".to_string(),
            cors_origin: "*".to_string(),
        }
    }

    /// Configured credential for `provider`. Blank values count as unset.
    pub fn credential(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::Groq => self.groq_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    /// Base URL for `provider`, reduced to scheme and host for logging.
    pub fn redacted_base_url(&self, provider: Provider) -> String {
        let base = match provider {
            Provider::Groq => &self.groq_base_url,
            Provider::OpenAI => &self.openai_base_url,
        };
        match Url::parse(base) {
            Ok(url) => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
            Err(_) => "<invalid url>".to_string(),
        }
    }

    /// Set up logging configuration.
    ///
    /// Configures the tracing subscriber with an `EnvFilter` built from the
    /// configured level.
    #[cfg(feature = "cli")]
    fn setup_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(&self.log_level))
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .try_init();
    }

    /// Validate configuration values and provide helpful error messages.
    ///
    /// Hard errors are returned; questionable-but-usable values only print a
    /// warning.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0. Please specify a valid port number (1-65535).".to_string());
        }

        if self.port < 1024 && cfg!(not(debug_assertions)) {
            eprintln!(
                "⚠️  Warning: Using privileged port {} may require root access. \
                Consider using a port >= 1024.",
                self.port
            );
        }

        if self.host.is_empty() {
            return Err("Host cannot be empty. Please specify a valid host (e.g., '0.0.0.0', 'localhost', or an IP address).".to_string());
        }

        if self.host != "localhost" && self.host.parse::<std::net::IpAddr>().is_err() {
            eprintln!(
                "⚠️  Warning: Host '{}' is not a recognized format. \
                Use '0.0.0.0' for all interfaces, 'localhost' for local access, or a valid IP address.",
                self.host
            );
        }

        for (name, base_url) in [("GROQ_BASE_URL", &self.groq_base_url), ("OPENAI_BASE_URL", &self.openai_base_url)] {
            self.validate_base_url(name, base_url)?;
        }

        if self.default_model.trim().is_empty() {
            return Err("Default model cannot be empty. Please specify a valid model identifier.".to_string());
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.environment.as_str()) {
            return Err(format!(
                "Invalid environment '{}'. Valid options are: {}",
                self.environment,
                valid_environments.join(", ")
            ));
        }

        if self.http_client_timeout == Some(0) {
            return Err("HTTP client timeout must be greater than 0 seconds (leave unset for no limit).".to_string());
        }
        if let Some(timeout) = self.http_client_timeout {
            if timeout < 30 {
                eprintln!(
                    "⚠️  Warning: HTTP client timeout of {} seconds may cut off long completions mid-stream.",
                    timeout
                );
            }
        }

        if self.http_connect_timeout == 0 {
            return Err("HTTP connect timeout must be greater than 0 seconds.".to_string());
        }

        if self.http_client_max_connections_per_host == 0 {
            return Err("HTTP client max connections per host must be greater than 0.".to_string());
        }

        if self.relay_channel_capacity == 0 {
            return Err("Relay channel capacity must be greater than 0.".to_string());
        }
        if self.relay_channel_capacity > 1024 {
            eprintln!(
                "⚠️  Warning: Relay channel capacity of {} weakens backpressure towards slow clients.",
                self.relay_channel_capacity
            );
        }

        if self.cors_origin.is_empty() {
            return Err("CORS origin cannot be empty. Use '*' or a specific origin.".to_string());
        }

        if self.environment == "production" {
            if self.cors_origin == "*" {
                eprintln!(
                    "⚠️  Warning: Using CORS origin '*' in production is not recommended. \
                    Consider specifying a specific origin."
                );
            }

            if self.log_level == "debug" || self.log_level == "trace" {
                eprintln!(
                    "⚠️  Warning: Using debug/trace logging in production may impact performance."
                );
            }
        }

        for provider in [Provider::Groq, Provider::OpenAI] {
            if self.credential(provider).is_none() {
                eprintln!(
                    "⚠️  Warning: {} is not set; requests for {} models will be rejected.",
                    provider.credential_env(),
                    provider
                );
            }
        }

        Ok(())
    }

    fn validate_base_url(&self, name: &str, base_url: &str) -> Result<(), String> {
        let url = Url::parse(base_url).map_err(|err| {
            format!(
                "Invalid {} '{}': {}. Please provide a valid URL (e.g., 'https://api.openai.com/v1').",
                name, base_url, err
            )
        })?;

        if !["http", "https"].contains(&url.scheme()) {
            return Err(format!(
                "Invalid {} scheme '{}'. Only 'http' and 'https' are supported.",
                name,
                url.scheme()
            ));
        }

        if url.host().is_none() {
            return Err(format!("{} must include a host.", name));
        }

        if self.environment == "production" && url.scheme() == "http" {
            eprintln!("⚠️  Warning: {} uses plain HTTP in production.", name);
        }

        Ok(())
    }
}
