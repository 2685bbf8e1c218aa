//! Generation service abstraction
//!
//! Provides a unified interface to the local Ollama HTTP API:
//! - Non-streaming generation (`/api/generate` with `"stream": false`)
//! - Streaming generation, concatenating the NDJSON fragments
//! - Model listing via the tags API

use crate::config::OllamaConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Trait for LLM text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt in a single response.
    ///
    /// `model` overrides the configured model when provided.
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String>;

    /// Generate text over the streaming API, concatenating every fragment
    /// until the server reports completion.
    async fn generate_streamed(&self, prompt: &str, model: Option<&str>) -> Result<String>;

    /// List the model names available on the generation server
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Get the configured model name
    fn model_name(&self) -> &str;
}

/// Ollama generation client
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// One NDJSON object of a streaming response
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn new(config: OllamaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.config.base_url.trim_end_matches('/'))
    }

    /// Translate transport failures into the service error taxonomy
    fn map_transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::GenerationTimeout {
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else if err.is_connect() {
            AppError::UpstreamUnavailable {
                message: err.to_string(),
            }
        } else {
            AppError::Generation {
                message: err.to_string(),
            }
        }
    }

    /// Make a generation request with retry
    async fn request_with_retry(&self, prompt: &str, model: &str) -> Result<String> {
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(prompt, model).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        error = %e,
                        "Generation request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Generation {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, prompt: &str, model: &str) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: GenerateResponse = response.json().await.map_err(|e| AppError::Generation {
            message: format!("Failed to parse response: {}", e),
        })?;

        let text = result.response.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Generation {
                message: "Generation returned an empty response".to_string(),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String> {
        let model = model.unwrap_or(&self.config.model);
        let start = Instant::now();

        let result = self.request_with_retry(prompt, model).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), model, result.is_ok());
        result
    }

    async fn generate_streamed(&self, prompt: &str, model: Option<&str>) -> Result<String> {
        let model = model.unwrap_or(&self.config.model);
        let start = Instant::now();

        let request = GenerateRequest {
            model,
            prompt,
            stream: true,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let mapped = self.map_transport_error(e);
                metrics::record_generation(start.elapsed().as_secs_f64(), model, false);
                mapped
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            metrics::record_generation(start.elapsed().as_secs_f64(), model, false);
            return Err(AppError::Generation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        let mut text = String::new();
        let mut done = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                let mapped = self.map_transport_error(e);
                metrics::record_generation(start.elapsed().as_secs_f64(), model, false);
                mapped
            })?;
            buf.extend_from_slice(&chunk);

            if drain_stream_lines(&mut buf, &mut text) {
                done = true;
                break;
            }
        }

        // The server may close the stream without a trailing newline
        if !done && !buf.is_empty() {
            buf.push(b'\n');
            drain_stream_lines(&mut buf, &mut text);
        }

        metrics::record_generation(start.elapsed().as_secs_f64(), model, true);

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Generation {
                message: "Generation returned an empty response".to_string(),
            });
        }

        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.tags_url())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            return Err(AppError::Generation {
                message: format!("API error {}", response.status()),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| AppError::Generation {
            message: format!("Failed to parse tags response: {}", e),
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Drain complete NDJSON lines from `buf`, appending each fragment to `out`.
///
/// Returns `true` once an object with `"done": true` has been seen.
/// Unparseable lines are skipped.
fn drain_stream_lines(buf: &mut Vec<u8>, out: &mut String) -> bool {
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(chunk) = serde_json::from_str::<StreamChunk>(line) else {
            continue;
        };

        out.push_str(&chunk.response);
        if chunk.done {
            return true;
        }
    }

    false
}

/// Mock generator for testing and offline runs
pub struct MockGenerator {
    response: String,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            response: "mock response".to_string(),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, _prompt: &str, _model: Option<&str>) -> Result<String> {
        Ok(self.response.clone())
    }

    async fn generate_streamed(&self, _prompt: &str, _model: Option<&str>) -> Result<String> {
        Ok(self.response.clone())
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["mock".to_string()])
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &OllamaConfig) -> Arc<dyn TextGenerator> {
    match config.model.as_str() {
        "mock" => Arc::new(MockGenerator::new()),
        _ => Arc::new(OllamaClient::new(config.clone())),
    }
}
