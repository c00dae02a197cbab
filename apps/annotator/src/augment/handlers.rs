//! Axum route handler for the Augment API.

use axum::{extract::State, Json};

use crate::augment::{run_augmentation, AugmentRequest, AugmentResponse};
use crate::errors::AppError;
use crate::output_formats::load_output_format;
use crate::state::AppState;

/// POST /api/v1/augment
///
/// Builds a few-shot prompt, calls the LLM and parses its reply. When
/// `groundTruth` is supplied the parsed annotations are also scored.
pub async fn handle_augment(
    State(state): State<AppState>,
    Json(request): Json<AugmentRequest>,
) -> Result<Json<AugmentResponse>, AppError> {
    let format = load_output_format(&state, request.output_format_id).await?;
    let response = run_augmentation(state.llm.as_ref(), &format, request).await?;
    Ok(Json(response))
}
