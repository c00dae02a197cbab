use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical sensory channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    Vision,
    Hearing,
    Taste,
    Smell,
    Touch,
}

impl Sense {
    /// Fixed canonical order. Display-name collisions are resolved in this order.
    pub const ALL: [Sense; 5] = [
        Sense::Vision,
        Sense::Hearing,
        Sense::Taste,
        Sense::Smell,
        Sense::Touch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sense::Vision => "Vision",
            Sense::Hearing => "Hearing",
            Sense::Taste => "Taste",
            Sense::Smell => "Smell",
            Sense::Touch => "Touch",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical valence of a perception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sensory annotation attached to a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub sense: Sense,
    pub stimulus: String,
    pub perception: String,
    pub sentiment: Sentiment,
    /// Free-text rationale. Only the narrative (CoT) encoding carries it.
    #[serde(rename = "CoT", default, skip_serializing_if = "Option::is_none")]
    pub cot: Option<String>,
}

impl Annotation {
    pub fn new(
        sense: Sense,
        stimulus: impl Into<String>,
        perception: impl Into<String>,
        sentiment: Sentiment,
    ) -> Self {
        Self {
            sense,
            stimulus: stimulus.into(),
            perception: perception.into(),
            sentiment,
            cot: None,
        }
    }

    pub fn with_cot(mut self, cot: impl Into<String>) -> Self {
        self.cot = Some(cot.into());
        self
    }
}

/// A character range of the document text plus its annotations.
///
/// Offsets count Unicode scalar values, `index_start` inclusive and `index_end` exclusive.
/// An empty `annotations` list means "no sensory content in this sentence".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub index_start: usize,
    pub index_end: usize,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Segment {
    pub fn new(index_start: usize, index_end: usize, annotations: Vec<Annotation>) -> Self {
        Self {
            index_start,
            index_end,
            annotations,
        }
    }

    /// Half-open interval overlap test.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.index_end && end > self.index_start
    }
}

/// A text and its annotated segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Document {
    pub fn new(text: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            text: text.into(),
            segments,
        }
    }

    /// Every annotation in segment order, paired with the index of its segment.
    pub fn annotations_with_segment(&self) -> impl Iterator<Item = (usize, &Annotation)> {
        self.segments
            .iter()
            .enumerate()
            .flat_map(|(i, segment)| segment.annotations.iter().map(move |a| (i, a)))
    }

    pub fn annotation_count(&self) -> usize {
        self.segments.iter().map(|s| s.annotations.len()).sum()
    }
}
