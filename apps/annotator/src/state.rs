use std::sync::Arc;

use crate::llm_client::ChatCompletion;
use crate::output_formats::OutputFormatStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable LLM backend. Production: `LlmClient`.
    pub llm: Arc<dyn ChatCompletion>,
    /// Pluggable OutputFormat storage. Default: `InMemoryOutputFormatStore`.
    pub output_formats: Arc<dyn OutputFormatStore>,
}

impl AppState {
    pub fn new(llm: Arc<dyn ChatCompletion>, output_formats: Arc<dyn OutputFormatStore>) -> Self {
        Self {
            llm,
            output_formats,
        }
    }
}
