use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; an empty API key leaves that backend unusable.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub deepseek_api_key: String,
    pub gemini_api_key: String,
    /// Base delay before the first LLM retry; doubles on each further attempt.
    pub llm_retry_interval_ms: u64,
    pub llm_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 3110).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            deepseek_api_key: std::env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            llm_retry_interval_ms: parse_env("LLM_RETRY_INTERVAL_MS", 5000)
                .context("LLM_RETRY_INTERVAL_MS must be a number of milliseconds")?,
            llm_max_retries: parse_env("LLM_MAX_RETRIES", 3)
                .context("LLM_MAX_RETRIES must be a non-negative integer")?,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{value}' for '{key}'")),
        Err(_) => Ok(default),
    }
}
