//! Bidirectional mapping between canonical values and an output format's display names.

use std::collections::HashMap;

use serde::Serialize;

use crate::codec::{CodecError, ParseMode};
use crate::models::{OutputFormat, Sense, Sentiment};

/// The four annotation fields, in the positional order used by every encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Sense,
    Stimulus,
    Perception,
    Sentiment,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Sense, Field::Stimulus, Field::Perception, Field::Sentiment];

    pub fn canonical(&self) -> &'static str {
        match self {
            Field::Sense => "sense",
            Field::Stimulus => "stimulus",
            Field::Perception => "perception",
            Field::Sentiment => "sentiment",
        }
    }
}

/// Two canonical entries configured with the same display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub kind: &'static str,
    pub display: String,
    pub kept: &'static str,
    pub shadowed: &'static str,
}

/// Display vocabulary of one `OutputFormat`, built once and reused.
///
/// When two canonical values share a display name, the earlier one in
/// canonical order (`Sense::ALL`, `Sentiment::ALL`) owns it on the way back.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    labels: [String; 4],
    senses: [String; 5],
    sentiments: [String; 3],
    sense_lookup: HashMap<String, Sense>,
    sentiment_lookup: HashMap<String, Sentiment>,
    collisions: Vec<Collision>,
}

fn or_canonical(value: &str, canonical: &str) -> String {
    if value.is_empty() {
        canonical.to_string()
    } else {
        value.to_string()
    }
}

impl Vocabulary {
    pub fn new(format: &OutputFormat) -> Self {
        let labels = [
            or_canonical(&format.sense_name, Field::Sense.canonical()),
            or_canonical(&format.stimulus_name, Field::Stimulus.canonical()),
            or_canonical(&format.perception_name, Field::Perception.canonical()),
            or_canonical(&format.sentiment_name, Field::Sentiment.canonical()),
        ];
        let senses = [
            or_canonical(&format.vision_name, Sense::Vision.as_str()),
            or_canonical(&format.hearing_name, Sense::Hearing.as_str()),
            or_canonical(&format.taste_name, Sense::Taste.as_str()),
            or_canonical(&format.smell_name, Sense::Smell.as_str()),
            or_canonical(&format.touch_name, Sense::Touch.as_str()),
        ];
        let sentiments = [
            or_canonical(&format.positive_name, Sentiment::Positive.as_str()),
            or_canonical(&format.negative_name, Sentiment::Negative.as_str()),
            or_canonical(&format.neutral_name, Sentiment::Neutral.as_str()),
        ];

        let mut collisions = Vec::new();

        let mut seen_labels: HashMap<&str, Field> = HashMap::new();
        for (field, label) in Field::ALL.iter().zip(&labels) {
            match seen_labels.get(label.as_str()) {
                Some(kept) => collisions.push(Collision {
                    kind: "field",
                    display: label.clone(),
                    kept: kept.canonical(),
                    shadowed: field.canonical(),
                }),
                None => {
                    seen_labels.insert(label, *field);
                }
            }
        }

        let mut sense_lookup = HashMap::new();
        for (sense, display) in Sense::ALL.iter().zip(&senses) {
            match sense_lookup.get(display) {
                Some(kept) => collisions.push(Collision {
                    kind: "sense",
                    display: display.clone(),
                    kept: Sense::as_str(kept),
                    shadowed: sense.as_str(),
                }),
                None => {
                    sense_lookup.insert(display.clone(), *sense);
                }
            }
        }

        let mut sentiment_lookup = HashMap::new();
        for (sentiment, display) in Sentiment::ALL.iter().zip(&sentiments) {
            match sentiment_lookup.get(display) {
                Some(kept) => collisions.push(Collision {
                    kind: "sentiment",
                    display: display.clone(),
                    kept: Sentiment::as_str(kept),
                    shadowed: sentiment.as_str(),
                }),
                None => {
                    sentiment_lookup.insert(display.clone(), *sentiment);
                }
            }
        }

        Self {
            labels,
            senses,
            sentiments,
            sense_lookup,
            sentiment_lookup,
            collisions,
        }
    }

    pub fn label(&self, field: Field) -> &str {
        &self.labels[field as usize]
    }

    pub fn sense_name(&self, sense: Sense) -> &str {
        &self.senses[sense as usize]
    }

    pub fn sentiment_name(&self, sentiment: Sentiment) -> &str {
        &self.sentiments[sentiment as usize]
    }

    pub fn sense_from_display(&self, value: &str) -> Option<Sense> {
        self.sense_lookup.get(value).copied()
    }

    pub fn sentiment_from_display(&self, value: &str) -> Option<Sentiment> {
        self.sentiment_lookup.get(value).copied()
    }

    /// Like `sense_from_display`, but strict mode turns an unknown value into an error.
    pub fn resolve_sense(&self, value: &str, mode: ParseMode) -> Result<Option<Sense>, CodecError> {
        match self.sense_from_display(value) {
            Some(sense) => Ok(Some(sense)),
            None if mode.is_strict() => Err(CodecError::UnknownValue {
                field: Field::Sense.canonical(),
                value: value.to_string(),
                expected: self.senses.join(", "),
            }),
            None => Ok(None),
        }
    }

    pub fn resolve_sentiment(
        &self,
        value: &str,
        mode: ParseMode,
    ) -> Result<Option<Sentiment>, CodecError> {
        match self.sentiment_from_display(value) {
            Some(sentiment) => Ok(Some(sentiment)),
            None if mode.is_strict() => Err(CodecError::UnknownValue {
                field: Field::Sentiment.canonical(),
                value: value.to_string(),
                expected: self.sentiments.join(", "),
            }),
            None => Ok(None),
        }
    }

    /// Display names shared by more than one canonical entry.
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }
}
