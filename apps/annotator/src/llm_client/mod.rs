/// LLM Client: the single point of entry for all chat-completion calls.
///
/// No other module talks to an LLM provider directly. Handlers and the
/// augmentation pipeline go through the `ChatCompletion` trait carried in
/// `AppState`; `LlmClient` is the production implementation.
///
/// The backend is inferred from the model name. Unknown models are rejected
/// before any request is made.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod backend;
pub mod handlers;

/// Sampling is deterministic for annotation work.
pub const TEMPERATURE: f32 = 0.0;
pub const MAX_OUTPUT_TOKENS: u32 = 8192;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Known models and the backend serving each.
const MODEL_TABLE: &[(&str, LlmBackend)] = &[
    ("deepseek-chat", LlmBackend::Deepseek),
    ("deepseek-reasoner", LlmBackend::Deepseek),
    ("gemini-2.0-flash", LlmBackend::Google),
    ("gemini-2.0-flash-lite", LlmBackend::Google),
    ("gemini-2.5-flash", LlmBackend::Google),
    ("gemini-2.5-flash-lite", LlmBackend::Google),
];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Unsupported model '{0}'")]
    UnsupportedModel(String),

    #[error("No API key configured for the {0} backend")]
    MissingApiKey(LlmBackend),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    Deepseek,
    Google,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackend::Deepseek => "deepseek",
            LlmBackend::Google => "google",
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks `model` up in the static model table.
pub fn infer_backend(model: &str) -> Result<LlmBackend, LlmError> {
    MODEL_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, backend)| *backend)
        .ok_or_else(|| LlmError::UnsupportedModel(model.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text of a completion plus the token usage the provider reported (0 when absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmCompletion {
    pub response: String,
    pub input_token: u32,
    pub output_token: u32,
}

/// Chat-completion seam. Carried in `AppState` as `Arc<dyn ChatCompletion>`.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        messages: &[LlmMessage],
        model: &str,
    ) -> Result<LlmCompletion, LlmError>;
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// HTTP client for the DeepSeek and Gemini backends.
/// Retries 429, 503 and 504 responses and transport errors with exponential backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    deepseek_api_key: String,
    gemini_api_key: String,
    retry_interval: Duration,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            deepseek_api_key: config.deepseek_api_key.clone(),
            gemini_api_key: config.gemini_api_key.clone(),
            retry_interval: Duration::from_millis(config.llm_retry_interval_ms),
            max_retries: config.llm_max_retries,
        })
    }

    fn api_key(&self, backend: LlmBackend) -> Result<&str, LlmError> {
        let key = match backend {
            LlmBackend::Deepseek => &self.deepseek_api_key,
            LlmBackend::Google => &self.gemini_api_key,
        };
        if key.is_empty() {
            return Err(LlmError::MissingApiKey(backend));
        }
        Ok(key)
    }

    /// Posts `body` and returns the raw success body.
    async fn post_with_retry<B: Serialize + Sync>(
        &self,
        backend: LlmBackend,
        url: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key(backend)?;
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self
                    .retry_interval
                    .saturating_mul(1u32 << (attempt - 1).min(16));
                warn!(
                    "{backend} call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let request = self.client.post(url).json(body);
            let request = match backend {
                LlmBackend::Deepseek => request.bearer_auth(api_key),
                LlmBackend::Google => request.header("x-goog-api-key", api_key),
            };

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if matches!(status.as_u16(), 429 | 503 | 504) {
                let body = response.text().await.unwrap_or_default();
                warn!("{backend} API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ProviderError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.text().await?);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.max_retries,
        }))
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn complete(
        &self,
        messages: &[LlmMessage],
        model: &str,
    ) -> Result<LlmCompletion, LlmError> {
        let backend = infer_backend(model)?;

        let completion = match backend {
            LlmBackend::Deepseek => {
                let request = backend::deepseek_request(model, messages);
                let body = self
                    .post_with_retry(backend, backend::DEEPSEEK_API_URL, &request)
                    .await?;
                backend::parse_deepseek_response(&body)?
            }
            LlmBackend::Google => {
                let request = backend::gemini_request(messages);
                let url = backend::gemini_url(model);
                let body = self.post_with_retry(backend, &url, &request).await?;
                backend::parse_gemini_response(&body)?
            }
        };

        debug!(
            "LLM call succeeded: model={model}, input_tokens={}, output_tokens={}",
            completion.input_token, completion.output_token
        );

        Ok(completion)
    }
}

/// Canned `ChatCompletion` for tests. Records every prompt it receives.
#[cfg(test)]
pub struct MockCompletion {
    reply: String,
    pub calls: std::sync::Mutex<Vec<Vec<LlmMessage>>>,
}

#[cfg(test)]
impl MockCompletion {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ChatCompletion for MockCompletion {
    async fn complete(
        &self,
        messages: &[LlmMessage],
        model: &str,
    ) -> Result<LlmCompletion, LlmError> {
        infer_backend(model)?;
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(LlmCompletion {
            response: self.reply.clone(),
            input_token: 12,
            output_token: 34,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_keys() -> Config {
        Config {
            port: 0,
            rust_log: "info".to_string(),
            deepseek_api_key: String::new(),
            gemini_api_key: String::new(),
            llm_retry_interval_ms: 1,
            llm_max_retries: 0,
        }
    }

    #[test]
    fn test_infer_backend_from_model_table() {
        assert_eq!(infer_backend("deepseek-chat").unwrap(), LlmBackend::Deepseek);
        assert_eq!(infer_backend("deepseek-reasoner").unwrap(), LlmBackend::Deepseek);
        assert_eq!(infer_backend("gemini-2.5-flash-lite").unwrap(), LlmBackend::Google);
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let err = infer_backend("gpt-4o").unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedModel(ref m) if m == "gpt-4o"));
        assert!(infer_backend("Deepseek-Chat").is_err());
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let json = serde_json::to_value(LlmMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        let role: Role = serde_json::from_str(r#""assistant""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn test_completion_serializes_token_counts_camel_case() {
        let completion = LlmCompletion {
            response: "ok".to_string(),
            input_token: 1,
            output_token: 2,
        };
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["inputToken"], 1);
        assert_eq!(json["outputToken"], 2);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let client = LlmClient::new(&config_without_keys()).unwrap();
        let err = client
            .complete(&[LlmMessage::user("hi")], "gemini-2.0-flash")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(LlmBackend::Google)));
    }

    #[tokio::test]
    async fn test_client_rejects_unknown_model() {
        let client = LlmClient::new(&config_without_keys()).unwrap();
        let err = client
            .complete(&[LlmMessage::user("hi")], "claude")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedModel(_)));
    }
}
