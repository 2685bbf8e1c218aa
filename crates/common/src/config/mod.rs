//! Configuration management for ThaiDoc services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Ollama generation service configuration
    pub ollama: OllamaConfig,

    /// PDF extraction configuration
    pub extraction: ExtractionConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    ///
    /// Sequential per-page correction can run for minutes on long chapter
    /// ranges, so this is much larger than a typical API timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaConfig {
    /// Base URL of the local Ollama server
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model to generate with (set to "mock" for the offline mock client)
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for failed generation requests
    #[serde(default = "default_ollama_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Number of leading non-empty lines treated as the page header
    #[serde(default = "default_header_lines")]
    pub header_lines: usize,

    /// Character cap on the extracted header
    #[serde(default = "default_header_max_chars")]
    pub header_max_chars: usize,

    /// Page corrected by /process-pdf/ when the request names none (1-based)
    #[serde(default = "default_page")]
    pub default_page: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 300 }
fn default_max_concurrent() -> usize { 100 }
fn default_ollama_base_url() -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { crate::DEFAULT_MODEL.to_string() }
fn default_ollama_timeout() -> u64 { 120 }
fn default_ollama_retries() -> u32 { 3 }
fn default_max_upload_bytes() -> usize { 25 * 1024 * 1024 }
fn default_header_lines() -> usize { 3 }
fn default_header_max_chars() -> usize { 200 }
fn default_page() -> u32 { 2 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__OLLAMA__MODEL=llama3.2:latest
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the Ollama per-request timeout as Duration
    pub fn ollama_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                max_concurrent_requests: default_max_concurrent(),
            },
            ollama: OllamaConfig {
                base_url: default_ollama_base_url(),
                model: default_ollama_model(),
                timeout_secs: default_ollama_timeout(),
                max_retries: default_ollama_retries(),
            },
            extraction: ExtractionConfig {
                max_upload_bytes: default_max_upload_bytes(),
                header_lines: default_header_lines(),
                header_max_chars: default_header_max_chars(),
                default_page: default_page(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
            },
        }
    }
}
