//! Evaluation: scores predicted annotations against ground truth.

pub mod f1;
pub mod handlers;

pub use f1::{aggregate, annotations_match, score_batch, score_document};
pub use f1::{IndividualDataMetrics, ValidationMetrics};
