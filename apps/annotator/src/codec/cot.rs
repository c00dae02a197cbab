//! Chain-of-Thought codec: a line-oriented narrative built from the output
//! format's four templates.
//!
//! ```text
//! <CoTStartTemplate>
//! <CoTSentenceExistTemplate with SENTENCE>
//! <CoTSentenceAnnotationTemplate with ANNOTATION [and COT]>   (one per annotation)
//! <CoTSentenceNotExistTemplate with SENTENCE>                 (sentence without annotations)
//! ```
//!
//! `ANNOTATION` is always `[<label: sense><label: stimulus><label: perception><label: sentiment>]`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::codec::offsets::{char_len, find_all, slice_chars};
use crate::codec::template::{is_placeholder_token, Anchor, Matcher, Template};
use crate::codec::vocabulary::{Field, Vocabulary};
use crate::codec::{CodecError, ParseMode, ParseOutcome, ParseWarning};
use crate::models::{Annotation, Document, OutputFormat, Segment, Sense, Sentiment};

const SENTENCE: &str = "SENTENCE";
const ANNOTATION: &str = "ANNOTATION";
const COT: &str = "COT";

static ANNOTATION_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[<(.+?)><(.+?)><(.+?)><(.+?)>\]$").expect("annotation pattern is valid")
});

/// Templates and vocabulary of one output format, compiled for repeated use.
pub struct CotCodec {
    vocabulary: Vocabulary,
    start: String,
    exist: Template,
    not_exist: Template,
    annotation: Template,
    exist_matcher: Option<Matcher>,
    not_exist_matcher: Option<Matcher>,
    annotation_matcher: Option<Matcher>,
}

impl CotCodec {
    pub fn new(format: &OutputFormat) -> Self {
        let exist = Template::compile(&format.cot_sentence_exist_template);
        let not_exist = Template::compile(&format.cot_sentence_not_exist_template);
        let annotation = Template::compile(&format.cot_sentence_annotation_template);

        Self {
            vocabulary: Vocabulary::new(format),
            start: format.cot_start_template.trim().to_string(),
            exist_matcher: exist.matcher(Anchor::Line),
            not_exist_matcher: not_exist.matcher(Anchor::Line),
            annotation_matcher: annotation.matcher(Anchor::Start),
            exist,
            not_exist,
            annotation,
        }
    }

    pub fn generate(&self, document: &Document) -> String {
        let mut lines: Vec<String> = Vec::new();

        if !self.start.is_empty() {
            lines.push(self.start.clone());
        }

        for segment in &document.segments {
            let sentence = slice_chars(&document.text, segment.index_start, segment.index_end);

            if segment.annotations.is_empty() {
                if !self.not_exist.is_empty() {
                    lines.push(self.not_exist.render_with(&[(SENTENCE, sentence)]));
                }
                continue;
            }

            if !self.exist.is_empty() {
                lines.push(self.exist.render_with(&[(SENTENCE, sentence)]));
            }

            if self.annotation.is_empty() {
                continue;
            }
            for annotation in &segment.annotations {
                let body = self.annotation_string(annotation);
                let line = self.annotation.render(|name| match name {
                    ANNOTATION => Some(body.as_str()),
                    COT => annotation.cot.as_deref(),
                    _ => None,
                });
                lines.push(line);
            }
        }

        lines.join("\n").trim_end().to_string()
    }

    /// The bracketed `[<label: value>...]` form of one annotation.
    pub fn annotation_string(&self, annotation: &Annotation) -> String {
        let v = &self.vocabulary;
        format!(
            "[<{}: {}><{}: {}><{}: {}><{}: {}>]",
            v.label(Field::Sense),
            v.sense_name(annotation.sense),
            v.label(Field::Stimulus),
            annotation.stimulus,
            v.label(Field::Perception),
            annotation.perception,
            v.label(Field::Sentiment),
            v.sentiment_name(annotation.sentiment),
        )
    }

    pub fn parse(
        &self,
        cot: &str,
        original_text: &str,
        mode: ParseMode,
    ) -> Result<ParseOutcome, CodecError> {
        let mut body = cot.trim();
        if !self.start.is_empty() {
            body = body.strip_prefix(self.start.as_str()).unwrap_or(body);
        }

        let mut segments: Vec<Segment> = Vec::new();
        let mut warnings: Vec<ParseWarning> = Vec::new();
        let mut open: Option<Segment> = None;

        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let from_exist = self
                .exist_matcher
                .as_ref()
                .and_then(|m| m.extract(line, SENTENCE));
            let from_not_exist = match from_exist {
                Some(_) => None,
                None => self
                    .not_exist_matcher
                    .as_ref()
                    .and_then(|m| m.extract(line, SENTENCE)),
            };

            if let Some(sentence) = from_exist.or(from_not_exist) {
                if let Some(segment) = open.take() {
                    segments.push(segment);
                }
                let (start, end) = locate_sentence(sentence, original_text, &segments, mode)?;
                let segment = Segment::new(start, end, Vec::new());
                if from_not_exist.is_some() {
                    segments.push(segment);
                } else {
                    open = Some(segment);
                }
                continue;
            }

            match self.parse_annotation_line(line, mode, &mut warnings) {
                Ok(annotation) => match open.as_mut() {
                    Some(segment) => segment.annotations.push(annotation),
                    None => debug!("Annotation line outside any sentence ignored: {line:?}"),
                },
                Err(e) if open.is_some() && mode.is_strict() => return Err(e),
                Err(e) => {
                    debug!("Skipping line {line:?}: {e}");
                    if open.is_some() {
                        warnings.push(ParseWarning::SkippedLine {
                            line: line.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(segment) = open.take() {
            segments.push(segment);
        }

        Ok(ParseOutcome { segments, warnings })
    }

    fn parse_annotation_line(
        &self,
        line: &str,
        mode: ParseMode,
        warnings: &mut Vec<ParseWarning>,
    ) -> Result<Annotation, CodecError> {
        let matcher = self
            .annotation_matcher
            .as_ref()
            .ok_or_else(|| CodecError::EmptyTemplate {
                template: "CoTSentenceAnnotationTemplate",
                line: line.to_string(),
            })?;

        let content = matcher
            .extract(line, ANNOTATION)
            .ok_or_else(|| CodecError::TemplateMismatch {
                template: "CoTSentenceAnnotationTemplate",
                line: line.to_string(),
                pattern: matcher.pattern().to_string(),
            })?;

        let fields = ANNOTATION_BODY
            .captures(content)
            .ok_or_else(|| CodecError::AnnotationFormat {
                content: content.to_string(),
            })?;

        let values: Vec<Option<&str>> = (1..=4)
            .map(|i| fields.get(i).and_then(|m| field_value(m.as_str())))
            .collect();

        let missing: Vec<&'static str> = Field::ALL
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| field.canonical())
            .collect();

        let (sense_value, stimulus, perception, sentiment_value) =
            match (values[0], values[1], values[2], values[3]) {
                (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                _ => {
                    return Err(CodecError::MissingFieldValues {
                        content: content.to_string(),
                        missing,
                    })
                }
            };

        let sense = match self.vocabulary.resolve_sense(sense_value, mode)? {
            Some(sense) => sense,
            None => {
                warn!("Unknown sense {sense_value:?} defaulted to Vision");
                warnings.push(ParseWarning::Degraded {
                    field: Field::Sense.canonical(),
                    value: sense_value.to_string(),
                    fallback: Sense::Vision.to_string(),
                });
                Sense::Vision
            }
        };

        let sentiment = match self.vocabulary.resolve_sentiment(sentiment_value, mode)? {
            Some(sentiment) => sentiment,
            None => {
                warn!("Unknown sentiment {sentiment_value:?} defaulted to Neutral");
                warnings.push(ParseWarning::Degraded {
                    field: Field::Sentiment.canonical(),
                    value: sentiment_value.to_string(),
                    fallback: Sentiment::Neutral.to_string(),
                });
                Sentiment::Neutral
            }
        };

        let cot = matcher
            .extract(line, COT)
            .filter(|value| !is_placeholder_token(value))
            .map(str::to_string);

        Ok(Annotation {
            sense,
            stimulus: stimulus.to_string(),
            perception: perception.to_string(),
            sentiment,
            cot,
        })
    }
}

/// `"label: value"` → trimmed value. The label must be non-empty; the value may contain colons.
fn field_value(field: &str) -> Option<&str> {
    let (label, value) = field.split_once(':')?;
    if label.is_empty() {
        return None;
    }
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Places `sentence` in `text`, preferring the first occurrence that does not
/// overlap an already placed segment.
fn locate_sentence(
    sentence: &str,
    text: &str,
    placed: &[Segment],
    mode: ParseMode,
) -> Result<(usize, usize), CodecError> {
    let occurrences = find_all(text, sentence);

    let Some(&first) = occurrences.first() else {
        if mode.is_strict() {
            return Err(CodecError::SentenceNotFound {
                sentence: sentence.to_string(),
            });
        }
        warn!("Sentence {sentence:?} not found in original text");
        return Ok((0, char_len(sentence)));
    };

    let free = occurrences
        .iter()
        .find(|(start, end)| !placed.iter().any(|s| s.overlaps(*start, *end)));

    match free {
        Some(&range) => Ok(range),
        None if mode.is_strict() => Err(CodecError::AllOccurrencesOverlap {
            sentence: sentence.to_string(),
        }),
        None => {
            warn!("Every occurrence of {sentence:?} overlaps a placed segment; using the first");
            Ok(first)
        }
    }
}

/// Renders `document` as CoT text under `format`.
pub fn generate(document: &Document, format: &OutputFormat) -> String {
    CotCodec::new(format).generate(document)
}

/// Parses CoT text back into segments of `original_text`.
pub fn parse(
    cot: &str,
    format: &OutputFormat,
    original_text: &str,
    mode: ParseMode,
) -> Result<Vec<Segment>, CodecError> {
    parse_detailed(cot, format, original_text, mode).map(|outcome| outcome.segments)
}

/// `parse`, keeping the warnings collected in permissive mode.
pub fn parse_detailed(
    cot: &str,
    format: &OutputFormat,
    original_text: &str,
    mode: ParseMode,
) -> Result<ParseOutcome, CodecError> {
    CotCodec::new(format).parse(cot, original_text, mode)
}
