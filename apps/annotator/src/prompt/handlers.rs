//! Axum route handlers for the Prompts API.

use std::collections::HashMap;

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::prompt::substitute;

#[derive(Debug, Deserialize)]
pub struct RenderPromptRequest {
    pub template: String,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct RenderPromptResponse {
    pub prompt: String,
}

/// POST /api/v1/prompts/render
pub async fn handle_render(
    Json(request): Json<RenderPromptRequest>,
) -> Result<Json<RenderPromptResponse>, AppError> {
    if request.template.trim().is_empty() {
        return Err(AppError::Validation("template cannot be empty".to_string()));
    }

    Ok(Json(RenderPromptResponse {
        prompt: substitute(&request.template, &request.context),
    }))
}
