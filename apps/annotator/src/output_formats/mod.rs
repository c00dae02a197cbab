//! Output format registry: storage seam, CRUD handlers and lookup for the other APIs.

pub mod handlers;
pub mod store;

pub use store::{InMemoryOutputFormatStore, OutputFormatStore};

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OutputFormat;
use crate::state::AppState;

/// Resolves an optional output format id. `None` selects the default format
/// (canonical names, no CoT templates).
pub async fn load_output_format(state: &AppState, id: Option<Uuid>) -> Result<OutputFormat, AppError> {
    let Some(id) = id else {
        return Ok(OutputFormat::default());
    };
    state
        .output_formats
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Output format {id} not found")))
}
