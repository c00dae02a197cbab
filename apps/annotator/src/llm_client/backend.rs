//! Wire formats of the two chat backends.
//!
//! DeepSeek speaks the OpenAI chat-completions dialect; Gemini uses
//! `generateContent`, where every non-user turn is a `model` turn.

use serde::{Deserialize, Serialize};

use crate::llm_client::{LlmCompletion, LlmError, LlmMessage, Role, MAX_OUTPUT_TOKENS, TEMPERATURE};

pub const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/chat/completions";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub fn gemini_url(model: &str) -> String {
    format!("{GEMINI_API_BASE}/{model}:generateContent")
}

// ────────────────────────────────────────────────────────────────────────────
// DeepSeek
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DeepseekRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct DeepseekResponse {
    #[serde(default)]
    choices: Vec<DeepseekChoice>,
    usage: Option<DeepseekUsage>,
}

#[derive(Debug, Deserialize)]
struct DeepseekChoice {
    message: DeepseekMessage,
}

#[derive(Debug, Deserialize)]
struct DeepseekMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepseekUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

pub fn deepseek_request<'a>(model: &'a str, messages: &'a [LlmMessage]) -> DeepseekRequest<'a> {
    DeepseekRequest {
        model,
        messages,
        temperature: TEMPERATURE,
        max_tokens: MAX_OUTPUT_TOKENS,
    }
}

/// An absent first choice reads as an empty response, not an error.
pub fn parse_deepseek_response(body: &str) -> Result<LlmCompletion, LlmError> {
    let parsed: DeepseekResponse = serde_json::from_str(body)?;
    let response = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    let (input_token, output_token) = parsed
        .usage
        .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));

    Ok(LlmCompletion {
        response,
        input_token,
        output_token,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

pub fn gemini_request(messages: &[LlmMessage]) -> GeminiRequest<'_> {
    let contents = messages
        .iter()
        .map(|message| GeminiContent {
            role: match message.role {
                Role::User => "user",
                Role::System | Role::Assistant => "model",
            },
            parts: [GeminiPart {
                text: &message.content,
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Concatenates the text parts of the first candidate. No text is an error.
pub fn parse_gemini_response(body: &str) -> Result<LlmCompletion, LlmError> {
    let parsed: GeminiResponse = serde_json::from_str(body)?;
    let response: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if response.is_empty() {
        return Err(LlmError::EmptyContent);
    }

    let (input_token, output_token) = parsed
        .usage_metadata
        .map_or((0, 0), |u| (u.prompt_token_count, u.candidates_token_count));

    Ok(LlmCompletion {
        response,
        input_token,
        output_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Vec<LlmMessage> {
        vec![
            LlmMessage {
                role: Role::System,
                content: "You annotate text.".to_string(),
            },
            LlmMessage::user("It rained."),
        ]
    }

    #[test]
    fn test_deepseek_request_body() {
        let messages = conversation();
        let json = serde_json::to_value(deepseek_request("deepseek-chat", &messages)).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["max_tokens"], 8192);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "It rained.");
    }

    #[test]
    fn test_parse_deepseek_response() {
        let body = r#"{
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Analysis:"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 45, "total_tokens": 165}
        }"#;
        let completion = parse_deepseek_response(body).unwrap();
        assert_eq!(completion.response, "Analysis:");
        assert_eq!((completion.input_token, completion.output_token), (120, 45));
    }

    #[test]
    fn test_parse_deepseek_response_without_choices_or_usage() {
        let completion = parse_deepseek_response(r#"{"choices": []}"#).unwrap();
        assert_eq!(completion.response, "");
        assert_eq!(completion.input_token, 0);
    }

    #[test]
    fn test_gemini_request_maps_non_user_roles_to_model() {
        let messages = conversation();
        let json = serde_json::to_value(gemini_request(&messages)).unwrap();
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][1]["role"], "user");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "It rained.");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_gemini_url() {
        assert_eq!(
            gemini_url("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_gemini_response_joins_parts() {
        let body = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "[{\"sense\""}, {"text": ": \"Vision\"}]"}]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 7, "totalTokenCount": 17}
        }"#;
        let completion = parse_gemini_response(body).unwrap();
        assert_eq!(completion.response, "[{\"sense\": \"Vision\"}]");
        assert_eq!((completion.input_token, completion.output_token), (10, 7));
    }

    #[test]
    fn test_parse_gemini_response_without_text_is_empty_content() {
        let err = parse_gemini_response(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
