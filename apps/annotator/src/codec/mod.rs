//! Annotation codecs: turn an annotated `Document` into the text an LLM is
//! trained or prompted with, and read an LLM's reply back into segments.
//!
//! All functions here are pure. An `OutputFormat` decides the vocabulary and
//! templates; `OutputFormatType` decides which encoding is used.

pub mod cot;
pub mod handlers;
pub mod json;
pub mod offsets;
pub mod template;
pub mod vocabulary;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Document, OutputFormat, OutputFormatType, Segment};

/// Error posture of the parsers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Skip malformed lines and substitute defaults for unknown values.
    #[default]
    Permissive,
    /// Fail on the first malformed line with a diagnostic error.
    Strict,
}

impl ParseMode {
    pub fn is_strict(self) -> bool {
        self == ParseMode::Strict
    }
}

impl From<bool> for ParseMode {
    fn from(strict: bool) -> Self {
        if strict {
            ParseMode::Strict
        } else {
            ParseMode::Permissive
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Template '{template}' is empty; cannot parse line \"{line}\"")]
    EmptyTemplate { template: &'static str, line: String },

    #[error("Line \"{line}\" does not match the {template} template (pattern: {pattern})")]
    TemplateMismatch {
        template: &'static str,
        line: String,
        pattern: String,
    },

    #[error(
        "Annotation \"{content}\" does not match the expected format \
         [<sense: value><stimulus: value><perception: value><sentiment: value>]"
    )]
    AnnotationFormat { content: String },

    #[error("Annotation \"{content}\" is missing values for: {}", missing.join(", "))]
    MissingFieldValues {
        content: String,
        missing: Vec<&'static str>,
    },

    #[error("Invalid {field} value \"{value}\"; expected one of: {expected}")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("Sentence \"{sentence}\" was not found in the original text")]
    SentenceNotFound { sentence: String },

    #[error("Every occurrence of sentence \"{sentence}\" overlaps an already placed segment")]
    AllOccurrencesOverlap { sentence: String },

    #[error("Output format type '{0}' has no codec")]
    UnsupportedFormat(OutputFormatType),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Something the permissive parser recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseWarning {
    /// An unknown sense/sentiment display value was replaced by a fixed default.
    #[serde(rename_all = "camelCase")]
    Degraded {
        field: &'static str,
        value: String,
        fallback: String,
    },
    /// A line following a sentence could not be read as an annotation.
    #[serde(rename_all = "camelCase")]
    SkippedLine { line: String, reason: String },
}

/// Segments recovered from raw LLM output, plus what was repaired on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub segments: Vec<Segment>,
    pub warnings: Vec<ParseWarning>,
}

/// Encodes `document` with the codec selected by `kind`.
pub fn serialize(
    document: &Document,
    format: &OutputFormat,
    kind: OutputFormatType,
) -> Result<String, CodecError> {
    match kind {
        OutputFormatType::Cot => Ok(cot::generate(document, format)),
        OutputFormatType::SensePrioritized => json::generate_sense_prioritized(document, format),
        OutputFormatType::OrderPreserving => json::generate_order_preserving(document, format),
        OutputFormatType::SenseSeparated => Err(CodecError::UnsupportedFormat(kind)),
    }
}

/// Decodes raw output of the encoding selected by `kind`.
///
/// The JSON codecs are always permissive; `mode` only affects CoT parsing.
pub fn deserialize(
    raw: &str,
    format: &OutputFormat,
    kind: OutputFormatType,
    original_text: &str,
    mode: ParseMode,
) -> Result<ParseOutcome, CodecError> {
    match kind {
        OutputFormatType::Cot => cot::parse_detailed(raw, format, original_text, mode),
        OutputFormatType::SensePrioritized => Ok(ParseOutcome {
            segments: json::parse_sense_prioritized(raw, format, original_text),
            warnings: Vec::new(),
        }),
        OutputFormatType::OrderPreserving => Ok(ParseOutcome {
            segments: json::parse_order_preserving(raw, format, original_text),
            warnings: Vec::new(),
        }),
        OutputFormatType::SenseSeparated => Err(CodecError::UnsupportedFormat(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Annotation, Sense, Sentiment};

    fn sample_document() -> Document {
        Document::new(
            "The soup tasted bitter.",
            vec![Segment::new(
                0,
                23,
                vec![Annotation::new(Sense::Taste, "soup", "bitter", Sentiment::Negative)],
            )],
        )
    }

    #[test]
    fn test_parse_mode_from_bool() {
        assert_eq!(ParseMode::from(true), ParseMode::Strict);
        assert_eq!(ParseMode::from(false), ParseMode::Permissive);
        assert!(!ParseMode::default().is_strict());
    }

    #[test]
    fn test_sense_separated_is_unsupported() {
        let result = serialize(
            &sample_document(),
            &OutputFormat::default(),
            OutputFormatType::SenseSeparated,
        );
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedFormat(OutputFormatType::SenseSeparated))
        ));
    }

    #[test]
    fn test_dispatch_round_trips_order_preserving() {
        let document = sample_document();
        let format = OutputFormat::default();
        let raw = serialize(&document, &format, OutputFormatType::OrderPreserving).unwrap();
        let outcome = deserialize(
            &raw,
            &format,
            OutputFormatType::OrderPreserving,
            &document.text,
            ParseMode::Permissive,
        )
        .unwrap();
        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].annotations, document.segments[0].annotations);
    }

    #[test]
    fn test_degraded_warning_serializes_with_kind_tag() {
        let warning = ParseWarning::Degraded {
            field: "sense",
            value: "Sixth".to_string(),
            fallback: "Vision".to_string(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "degraded");
        assert_eq!(json["field"], "sense");
        assert_eq!(json["fallback"], "Vision");
    }
}
