//! Axum route handlers for the Evaluation API.

use axum::Json;
use serde::Deserialize;

use crate::evaluation::{score_batch, ValidationMetrics};
use crate::models::{Document, Segment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreItem {
    pub ground_truth: Document,
    #[serde(default)]
    pub predicted: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub items: Vec<ScoreItem>,
}

/// POST /api/v1/evaluation/score
///
/// Scoring never fails; an empty `items` list yields all-zero metrics.
pub async fn handle_score(Json(request): Json<ScoreRequest>) -> Json<ValidationMetrics> {
    let metrics = score_batch(
        request
            .items
            .iter()
            .map(|item| (&item.ground_truth, item.predicted.as_slice())),
    );
    Json(metrics)
}
