use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// User-defined serialization configuration: display names and CoT templates.
///
/// Every string field may be empty. Empty overrides fall back to canonical names,
/// so `OutputFormat::default()` is a usable configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputFormat {
    pub id: Uuid,
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,

    // Field labels
    #[serde(deserialize_with = "null_as_empty")]
    pub sense_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub stimulus_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub perception_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub sentiment_name: String,

    // Sense value names
    #[serde(deserialize_with = "null_as_empty")]
    pub vision_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub hearing_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub taste_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub smell_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub touch_name: String,

    // Sentiment value names
    #[serde(deserialize_with = "null_as_empty")]
    pub positive_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub negative_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub neutral_name: String,

    #[serde(rename = "CoTStartTemplate", deserialize_with = "null_as_empty")]
    pub cot_start_template: String,
    #[serde(rename = "CoTSentenceExistTemplate", deserialize_with = "null_as_empty")]
    pub cot_sentence_exist_template: String,
    #[serde(rename = "CoTSentenceNotExistTemplate", deserialize_with = "null_as_empty")]
    pub cot_sentence_not_exist_template: String,
    #[serde(rename = "CoTSentenceAnnotationTemplate", deserialize_with = "null_as_empty")]
    pub cot_sentence_annotation_template: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored records may carry explicit `null` for unset names and templates.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Which encoding an LLM is asked to produce (and which codec reads it back).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormatType {
    SensePrioritized,
    OrderPreserving,
    /// Declared by the dataset tooling but never given an encoder.
    SenseSeparated,
    Cot,
}

impl OutputFormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormatType::SensePrioritized => "sense-prioritized",
            OutputFormatType::OrderPreserving => "order-preserving",
            OutputFormatType::SenseSeparated => "sense-separated",
            OutputFormatType::Cot => "cot",
        }
    }
}

impl fmt::Display for OutputFormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
