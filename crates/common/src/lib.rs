//! ThaiDoc Common Library
//!
//! Shared code for the ThaiDoc services including:
//! - Configuration management
//! - Error types and handling
//! - LLM generation client abstraction (Ollama)
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::TextGenerator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default generation model
pub const DEFAULT_MODEL: &str = "llama3.2:latest";
