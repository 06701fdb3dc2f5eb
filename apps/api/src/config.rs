use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Credentials are optional at startup: a request with neither provider
/// configured fails with a configuration error, the process itself boots fine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered Groq key pool, from the comma-delimited GROQ_API_KEYS value.
    pub groq_api_keys: Vec<String>,
    /// Optional primary-provider key. Absent means skip straight to Groq.
    pub gemini_api_key: Option<String>,
    /// Optional preferred-model override for the head of the Groq chain.
    pub groq_model: Option<String>,
    /// Per-attempt HTTP timeout.
    pub request_timeout_secs: u64,
    /// Aggregate wall-clock cap across all attempts of one analysis request.
    pub analyze_deadline_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            groq_api_keys: split_keys(&std::env::var("GROQ_API_KEYS").unwrap_or_default()),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            groq_model: optional_env("GROQ_MODEL"),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            analyze_deadline_secs: std::env::var("ANALYZE_DEADLINE_SECS")
                .unwrap_or_else(|_| "180".to_string())
                .parse::<u64>()
                .context("ANALYZE_DEADLINE_SECS must be a number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Splits a comma-delimited key list, dropping blanks, preserving order.
fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// A set-but-empty variable counts as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
