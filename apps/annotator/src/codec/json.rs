//! JSON codecs. Both flatten the segment structure:
//! - sense-prioritized: `{ "<sense display>": [ {<label>: <value>, ...}, ... ], ... }`
//! - order-preserving: `[ {<label>: <value>, ...}, ... ]` in segment order
//!
//! Parsing is lossy: the result is a single segment spanning the whole text.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::codec::offsets::char_len;
use crate::codec::vocabulary::{Field, Vocabulary};
use crate::codec::CodecError;
use crate::models::{Annotation, Document, OutputFormat, Segment};

/// Rendered in place of JSON when a document has no annotations.
pub const NO_ANNOTATIONS: &str = "No annotations to display";

fn display_object(annotation: &Annotation, vocabulary: &Vocabulary) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(
        vocabulary.label(Field::Sense).to_string(),
        Value::String(vocabulary.sense_name(annotation.sense).to_string()),
    );
    object.insert(
        vocabulary.label(Field::Stimulus).to_string(),
        Value::String(annotation.stimulus.clone()),
    );
    object.insert(
        vocabulary.label(Field::Perception).to_string(),
        Value::String(annotation.perception.clone()),
    );
    object.insert(
        vocabulary.label(Field::Sentiment).to_string(),
        Value::String(vocabulary.sentiment_name(annotation.sentiment).to_string()),
    );
    object
}

pub fn generate_sense_prioritized(
    document: &Document,
    format: &OutputFormat,
) -> Result<String, CodecError> {
    if document.annotation_count() == 0 {
        return Ok(NO_ANNOTATIONS.to_string());
    }

    let vocabulary = Vocabulary::new(format);
    let mut groups: Map<String, Value> = Map::new();

    for (_, annotation) in document.annotations_with_segment() {
        let key = vocabulary.sense_name(annotation.sense).to_string();
        let entry = Value::Object(display_object(annotation, &vocabulary));
        if let Some(items) = groups
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
        {
            items.push(entry);
        }
    }

    Ok(serde_json::to_string_pretty(&groups)?)
}

pub fn generate_order_preserving(
    document: &Document,
    format: &OutputFormat,
) -> Result<String, CodecError> {
    if document.annotation_count() == 0 {
        return Ok(NO_ANNOTATIONS.to_string());
    }

    let vocabulary = Vocabulary::new(format);
    // Segment order is already annotation order.
    let items: Vec<Value> = document
        .annotations_with_segment()
        .map(|(_, annotation)| Value::Object(display_object(annotation, &vocabulary)))
        .collect();

    Ok(serde_json::to_string_pretty(&items)?)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let inner = inner.trim_start();
    inner
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(inner)
}

fn parse_value(raw: &str) -> Option<Value> {
    match serde_json::from_str(strip_json_fences(raw)) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse annotation JSON: {e}");
            None
        }
    }
}

/// Reads one display-named object. Returns `None` for anything malformed.
fn annotation_from_object(item: &Value, vocabulary: &Vocabulary) -> Option<Annotation> {
    let object = item.as_object()?;
    let field = |f: Field| object.get(vocabulary.label(f)).and_then(Value::as_str);

    let sense = vocabulary.sense_from_display(field(Field::Sense)?)?;
    let sentiment = vocabulary.sentiment_from_display(field(Field::Sentiment)?)?;
    let stimulus = field(Field::Stimulus).filter(|s| !s.is_empty())?;
    let perception = field(Field::Perception).filter(|s| !s.is_empty())?;

    Some(Annotation::new(sense, stimulus, perception, sentiment))
}

fn whole_text_segment(annotations: Vec<Annotation>, original_text: &str) -> Vec<Segment> {
    vec![Segment::new(0, char_len(original_text), annotations)]
}

fn collect_annotations<'a>(
    items: impl Iterator<Item = &'a Value>,
    vocabulary: &Vocabulary,
) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for item in items {
        match annotation_from_object(item, vocabulary) {
            Some(annotation) => annotations.push(annotation),
            None => debug!("Dropping malformed annotation entry: {item}"),
        }
    }
    annotations
}

pub fn parse_sense_prioritized(
    raw: &str,
    format: &OutputFormat,
    original_text: &str,
) -> Vec<Segment> {
    let Some(value) = parse_value(raw) else {
        return Vec::new();
    };
    // Groups are read from an object's values or an array's elements alike;
    // only members that are arrays contribute annotations.
    let groups: Vec<&Value> = match &value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => {
            warn!("Sense-prioritized JSON must be an object of arrays");
            return Vec::new();
        }
    };

    let vocabulary = Vocabulary::new(format);
    let items = groups
        .into_iter()
        .filter_map(Value::as_array)
        .flat_map(|items| items.iter());

    whole_text_segment(collect_annotations(items, &vocabulary), original_text)
}

pub fn parse_order_preserving(
    raw: &str,
    format: &OutputFormat,
    original_text: &str,
) -> Vec<Segment> {
    let Some(value) = parse_value(raw) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        warn!("Order-preserving JSON must be an array");
        return Vec::new();
    };

    let vocabulary = Vocabulary::new(format);
    whole_text_segment(collect_annotations(items.iter(), &vocabulary), original_text)
}
