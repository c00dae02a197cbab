pub mod annotation;
pub mod output_format;

pub use annotation::{Annotation, Document, Segment, Sense, Sentiment};
pub use output_format::{OutputFormat, OutputFormatType};
