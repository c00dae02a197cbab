//! Prompt construction: `{{ KEY }}` substitution and few-shot example blocks.

pub mod examples;
pub mod handlers;
pub mod substitution;

pub use examples::render_examples;
pub use substitution::{build_prompt, substitute};
