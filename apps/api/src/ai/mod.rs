//! AI Client — the single point of entry for all LLM calls in the ResuVibe API.
//!
//! ARCHITECTURAL RULE: No other module may call a provider API directly.
//! All LLM interactions MUST go through `AiClient::analyze`.
//!
//! Call path: primary provider (Gemini, one key, one model, exactly one
//! attempt), then on quota errors only, the Groq dispatcher (key rotation
//! across the model chain). Non-quota primary errors surface unchanged:
//! a malformed request fails the same way on the secondary.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

pub mod dispatch;
pub mod rotation;
pub mod sanitize;
pub mod transport;

use crate::config::Config;
use dispatch::{model_chain, GroqDispatcher};
use rotation::KeyRotator;
use sanitize::sanitize;
use transport::{CallOutcome, ChatMessage, ChatTransport, GeminiTransport, GroqTransport};

pub use transport::GEMINI_MODEL;

#[derive(Debug, Error)]
pub enum AiError {
    /// No provider usable at all. Surfaced before any network call.
    #[error("no AI provider configured: set GEMINI_API_KEY or GROQ_API_KEYS")]
    Config,

    /// The rotation pool is empty.
    #[error("no API keys available for rotation")]
    NoCredentials,

    /// Transport-level or non-quota provider failure.
    #[error("provider call failed: {message}")]
    Transport { message: String },

    /// A 2xx body from which no JSON could be recovered. Terminal for the
    /// attempt — retrying with another key does not fix malformed output.
    #[error("model returned unparsable output: {raw}")]
    Parse { raw: String },

    /// Every (model, key) combination in the Groq pool was tried.
    #[error("all {attempts} Groq attempts exhausted")]
    Exhausted { attempts: u32 },

    /// The primary was throttled and no secondary pool remains.
    #[error("all AI providers failed")]
    AllProvidersFailed,
}

/// Primary provider: one key, one fixed model, no rotation.
struct Primary {
    transport: Arc<dyn ChatTransport>,
    model: String,
    api_key: String,
}

/// The single AI client shared by all handlers via `AppState`.
#[derive(Clone)]
pub struct AiClient {
    primary: Option<Arc<Primary>>,
    secondary: Option<Arc<GroqDispatcher>>,
}

impl AiClient {
    /// Wires the production providers from config. Providers with no
    /// credentials are left unconfigured; the configuration error surfaces
    /// per request, not at startup.
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        let primary = config.gemini_api_key.as_ref().map(|key| {
            Arc::new(Primary {
                transport: Arc::new(GeminiTransport::new(client.clone())) as Arc<dyn ChatTransport>,
                model: GEMINI_MODEL.to_string(),
                api_key: key.clone(),
            })
        });

        let secondary = if config.groq_api_keys.is_empty() {
            None
        } else {
            let models = model_chain(config.groq_model.as_deref());
            info!(keys = config.groq_api_keys.len(), chain = ?models, "Groq pool configured");
            Some(Arc::new(GroqDispatcher::new(
                Arc::new(GroqTransport::new(client)) as Arc<dyn ChatTransport>,
                models,
                Arc::new(KeyRotator::new(config.groq_api_keys.clone())),
            )))
        };

        Self { primary, secondary }
    }

    /// Test seam: assemble a client from pre-built parts.
    #[cfg(test)]
    fn from_parts(
        primary: Option<(Arc<dyn ChatTransport>, &str, &str)>,
        secondary: Option<GroqDispatcher>,
    ) -> Self {
        Self {
            primary: primary.map(|(transport, model, key)| {
                Arc::new(Primary {
                    transport,
                    model: model.to_string(),
                    api_key: key.to_string(),
                })
            }),
            secondary: secondary.map(Arc::new),
        }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn secondary_key_count(&self) -> usize {
        self.secondary.as_ref().map_or(0, |d| d.key_count())
    }

    /// Sends one system + one user message and returns the model's parsed
    /// JSON payload. No schema validation beyond the parse — a payload with
    /// unexpected keys passes through to the caller untouched.
    pub async fn analyze(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError> {
        if self.primary.is_none() && self.secondary.is_none() {
            return Err(AiError::Config);
        }

        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ];

        if let Some(primary) = &self.primary {
            match primary
                .transport
                .send(&primary.model, &primary.api_key, &messages)
                .await
            {
                CallOutcome::Success(body) => return sanitize(&body),
                CallOutcome::RateLimited { status, .. } => {
                    warn!(status, "primary provider throttled, falling back to Groq pool");
                }
                // A non-quota primary failure is surfaced unchanged, never
                // retried against the secondary.
                CallOutcome::Failed { message } => return Err(AiError::Transport { message }),
            }
        }

        match &self.secondary {
            Some(dispatcher) => dispatcher.dispatch(&messages).await,
            None => Err(AiError::AllProvidersFailed),
        }
    }
}
