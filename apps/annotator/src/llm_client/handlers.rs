//! Axum route handler for direct LLM calls.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::AppError;
use crate::llm_client::{infer_backend, LlmBackend, LlmMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallLlmRequest {
    pub messages: Vec<LlmMessage>,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLlmResponse {
    pub response: String,
    pub input_token: u32,
    pub output_token: u32,
    pub model: String,
    pub backend: LlmBackend,
}

/// POST /api/v1/llm/call
pub async fn handle_call(
    State(state): State<AppState>,
    Json(request): Json<CallLlmRequest>,
) -> Result<Json<CallLlmResponse>, AppError> {
    if request.messages.is_empty() {
        return Err(AppError::Validation("messages cannot be empty".to_string()));
    }

    let backend = infer_backend(&request.model)?;

    let completion = state
        .llm
        .complete(&request.messages, &request.model)
        .await
        .inspect_err(|e| error!("LLM call failed: model={}, error={e}", request.model))?;

    info!(
        "LLM call completed: model={}, backend={backend}, input_token={}, output_token={}",
        request.model, completion.input_token, completion.output_token
    );

    Ok(Json(CallLlmResponse {
        response: completion.response,
        input_token: completion.input_token,
        output_token: completion.output_token,
        model: request.model,
        backend,
    }))
}
