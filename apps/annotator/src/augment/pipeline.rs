use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::codec::{self, ParseMode, ParseWarning};
use crate::errors::AppError;
use crate::evaluation::{score_document, IndividualDataMetrics};
use crate::llm_client::{infer_backend, ChatCompletion, LlmMessage};
use crate::models::{Document, OutputFormat, OutputFormatType, Segment};
use crate::prompt::{build_prompt, render_examples};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentRequest {
    /// Text to annotate. Defaults to the ground truth's text in validation mode.
    #[serde(default)]
    pub text: Option<String>,
    /// Prompt template with `{{ INPUT }}` and optionally `{{ EXAMPLES }}`.
    pub prompt: String,
    #[serde(default)]
    pub examples: Vec<Document>,
    /// Per-example template with `{{ INPUT }}` and `{{ OUTPUT }}`.
    #[serde(default)]
    pub example_template: String,
    /// Caps how many of `examples` are rendered.
    #[serde(default)]
    pub example_count: Option<usize>,
    pub output_format_id: Option<Uuid>,
    pub format_type: OutputFormatType,
    pub model: String,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub ground_truth: Option<Document>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentResponse {
    pub prompt: String,
    pub raw_response: String,
    pub segments: Vec<Segment>,
    pub warnings: Vec<ParseWarning>,
    pub input_token: u32,
    pub output_token: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<IndividualDataMetrics>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs one augmentation: validate → render examples → build prompt → call
/// the LLM → parse the reply → score it when ground truth is present.
///
/// The model is checked before any work so an unknown model never reaches the LLM.
pub async fn run_augmentation(
    llm: &dyn ChatCompletion,
    format: &OutputFormat,
    request: AugmentRequest,
) -> Result<AugmentResponse, AppError> {
    let backend = infer_backend(&request.model)?;

    let text = request
        .text
        .clone()
        .or_else(|| request.ground_truth.as_ref().map(|d| d.text.clone()))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("text or groundTruth is required".to_string()))?;

    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let example_count = request
        .example_count
        .unwrap_or(request.examples.len())
        .min(request.examples.len());
    let examples = render_examples(
        &request.examples[..example_count],
        format,
        request.format_type,
        &request.example_template,
    )?;
    let prompt = build_prompt(&request.prompt, &text, &examples);

    let completion = llm
        .complete(&[LlmMessage::user(prompt.clone())], &request.model)
        .await?;

    let outcome = codec::deserialize(
        &completion.response,
        format,
        request.format_type,
        &text,
        ParseMode::from(request.strict),
    )?;

    if outcome.segments.is_empty() {
        warn!("LLM reply produced no segments (model={})", request.model);
    }

    let metrics = request
        .ground_truth
        .as_ref()
        .map(|truth| score_document(truth, &outcome.segments, 0));

    info!(
        "Augmentation complete: model={}, backend={backend}, examples={example_count}, segments={}, f1={:?}",
        request.model,
        outcome.segments.len(),
        metrics.as_ref().map(|m| m.f1)
    );

    Ok(AugmentResponse {
        prompt,
        raw_response: completion.response,
        segments: outcome.segments,
        warnings: outcome.warnings,
        input_token: completion.input_token,
        output_token: completion.output_token,
        metrics,
    })
}
