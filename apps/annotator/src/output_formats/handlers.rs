//! Axum route handlers for the Output Formats API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::codec::template::Template;
use crate::codec::vocabulary::Vocabulary;
use crate::errors::AppError;
use crate::models::OutputFormat;
use crate::state::AppState;

/// Server-managed keys a request body may not set.
const READ_ONLY_KEYS: [&str; 3] = ["id", "createdAt", "updatedAt"];

#[derive(Debug, Serialize)]
pub struct DeleteOutputFormatResponse {
    pub deleted: bool,
    pub id: Uuid,
}

/// Rejects an empty name, a set CoT template missing its required placeholder,
/// and display names shared by two canonical values.
fn validate(format: &OutputFormat) -> Result<(), AppError> {
    if format.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let required = [
        ("CoTSentenceExistTemplate", &format.cot_sentence_exist_template, "SENTENCE"),
        ("CoTSentenceNotExistTemplate", &format.cot_sentence_not_exist_template, "SENTENCE"),
        ("CoTSentenceAnnotationTemplate", &format.cot_sentence_annotation_template, "ANNOTATION"),
    ];
    for (key, source, placeholder) in required {
        let template = Template::compile(source);
        if !template.is_empty() && !template.has_placeholder(placeholder) {
            return Err(AppError::Validation(format!(
                "{key} must contain {{{{ {placeholder} }}}}"
            )));
        }
    }

    let vocabulary = Vocabulary::new(format);
    if let Some(collision) = vocabulary.collisions().first() {
        return Err(AppError::Validation(format!(
            "{} display name \"{}\" is used for both {} and {}",
            collision.kind, collision.display, collision.kept, collision.shadowed
        )));
    }
    Ok(())
}

async fn ensure_name_free(state: &AppState, name: &str, except: Option<Uuid>) -> Result<(), AppError> {
    match state.output_formats.find_by_name(name).await? {
        Some(existing) if Some(existing.id) != except => Err(AppError::Conflict(
            "Output format with this name already exists".to_string(),
        )),
        _ => Ok(()),
    }
}

fn strip_read_only(mut body: Map<String, Value>) -> Map<String, Value> {
    for key in READ_ONLY_KEYS {
        body.remove(key);
    }
    body
}

/// GET /api/v1/output-formats
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<OutputFormat>>, AppError> {
    Ok(Json(state.output_formats.list().await?))
}

/// GET /api/v1/output-formats/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OutputFormat>, AppError> {
    let format = state
        .output_formats
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Output format not found".to_string()))?;
    Ok(Json(format))
}

/// POST /api/v1/output-formats
pub async fn handle_create(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<OutputFormat>), AppError> {
    let mut format: OutputFormat = serde_json::from_value(Value::Object(strip_read_only(body)))
        .map_err(|e| AppError::Validation(format!("Invalid output format: {e}")))?;

    validate(&format)?;
    ensure_name_free(&state, &format.name, None).await?;

    let now = Utc::now();
    format.id = Uuid::new_v4();
    format.created_at = now;
    format.updated_at = now;

    state.output_formats.insert(format.clone()).await?;
    info!("Output format created: id={}, name={}", format.id, format.name);

    Ok((StatusCode::CREATED, Json(format)))
}

/// PUT /api/v1/output-formats/:id
///
/// Keys present in the body replace the stored values; absent keys are kept.
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<OutputFormat>, AppError> {
    let existing = state
        .output_formats
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Output format not found".to_string()))?;

    let mut merged = match serde_json::to_value(&existing).map_err(anyhow::Error::from)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    merged.extend(strip_read_only(body));

    let mut format: OutputFormat = serde_json::from_value(Value::Object(merged))
        .map_err(|e| AppError::Validation(format!("Invalid output format: {e}")))?;

    validate(&format)?;
    if format.name != existing.name {
        ensure_name_free(&state, &format.name, Some(id)).await?;
    }

    format.id = id;
    format.created_at = existing.created_at;
    format.updated_at = Utc::now();

    if !state.output_formats.update(format.clone()).await? {
        return Err(AppError::NotFound("Output format not found".to_string()));
    }
    info!("Output format updated: id={id}");

    Ok(Json(format))
}

/// DELETE /api/v1/output-formats/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteOutputFormatResponse>, AppError> {
    if state.output_formats.get(id).await?.is_none() {
        return Err(AppError::NotFound("Output format not found".to_string()));
    }

    let deleted = state.output_formats.delete(id).await?;
    info!("Output format deleted: id={id}");

    Ok(Json(DeleteOutputFormatResponse { deleted, id }))
}
