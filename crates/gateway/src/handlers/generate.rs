//! Prompt forwarding handlers
//!
//! `/ollama` forwards a prompt to the local generation server over the
//! streaming API and returns the concatenated text.

use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use thaidoc_common::errors::AppError;
use tracing::instrument;

/// Prompt used when the request carries none, kept from this endpoint's
/// original smoke-test behavior
const DEFAULT_PROMPT: &str = "this is ollama";

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub prompt: Option<String>,
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub response: String,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

#[instrument(skip(state))]
pub async fn generate(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GenerateResponse>, AppError> {
    let prompt = params.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);

    let response = state
        .generator
        .generate_streamed(prompt, params.model.as_deref())
        .await?;

    Ok(Json(GenerateResponse { response }))
}

#[instrument(skip(state))]
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelsResponse>, AppError> {
    let models = state.generator.list_models().await?;
    Ok(Json(ModelsResponse { models }))
}
