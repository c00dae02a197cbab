//! Axum route handlers for the Annotations API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::codec::{self, ParseWarning};
use crate::errors::AppError;
use crate::models::{Document, OutputFormatType, Segment};
use crate::output_formats::load_output_format;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializeRequest {
    pub document: Document,
    /// Omitted → canonical names and no CoT templates.
    pub output_format_id: Option<Uuid>,
    pub format_type: OutputFormatType,
}

#[derive(Debug, Serialize)]
pub struct SerializeResponse {
    pub output: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub raw: String,
    pub text: String,
    pub output_format_id: Option<Uuid>,
    pub format_type: OutputFormatType,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub segments: Vec<Segment>,
    pub warnings: Vec<ParseWarning>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/annotations/serialize
pub async fn handle_serialize(
    State(state): State<AppState>,
    Json(request): Json<SerializeRequest>,
) -> Result<Json<SerializeResponse>, AppError> {
    let format = load_output_format(&state, request.output_format_id).await?;
    let output = codec::serialize(&request.document, &format, request.format_type)?;

    Ok(Json(SerializeResponse { output }))
}

/// POST /api/v1/annotations/parse
///
/// Reads raw LLM output back into segments of `text`. With `strict` the first
/// malformed line fails the request with 422 instead of being skipped.
pub async fn handle_parse(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> Result<Json<ParseResponse>, AppError> {
    let format = load_output_format(&state, request.output_format_id).await?;
    let outcome = codec::deserialize(
        &request.raw,
        &format,
        request.format_type,
        &request.text,
        request.strict.into(),
    )?;

    debug!(
        "Parsed {} segments with {} warnings",
        outcome.segments.len(),
        outcome.warnings.len()
    );

    Ok(Json(ParseResponse {
        segments: outcome.segments,
        warnings: outcome.warnings,
    }))
}
