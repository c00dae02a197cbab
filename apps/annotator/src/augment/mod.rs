//! LLM-assisted augmentation: few-shot prompt → LLM → parsed annotations,
//! optionally scored against ground truth (validation mode).

pub mod handlers;
pub mod pipeline;

pub use pipeline::{run_augmentation, AugmentRequest, AugmentResponse};
