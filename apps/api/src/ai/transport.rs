//! Provider wire calls.
//!
//! ARCHITECTURAL RULE: the status category of an outbound call is fixed HERE,
//! from the HTTP status at the transport boundary. Callers branch on
//! `CallOutcome` — nobody re-derives the category from message text later.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// One message in the conversation sent to a provider.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Result category of one outbound provider call.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// 2xx — carries the completion text already pulled out of the
    /// provider's response envelope.
    Success(String),
    /// 429 / quota exhaustion. Recoverable by key rotation or fallback.
    RateLimited { status: u16, message: String },
    /// Everything else: connect/timeout failures and non-2xx responses.
    Failed { message: String },
}

/// The single seam between the dispatch logic and the network. Dispatcher and
/// orchestrator tests inject scripted implementations of this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, model: &str, api_key: &str, messages: &[ChatMessage]) -> CallOutcome;
}

// ────────────────────────────────────────────────────────────────────────────
// Groq — OpenAI-compatible chat completions (secondary provider pool)
// ────────────────────────────────────────────────────────────────────────────

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const TEMPERATURE: f32 = 0.7;

pub struct GroqTransport {
    client: Client,
}

impl GroqTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatTransport for GroqTransport {
    async fn send(&self, model: &str, api_key: &str, messages: &[ChatMessage]) -> CallOutcome {
        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" },
        });

        let response = match self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return CallOutcome::Failed {
                    message: format!("Groq request failed: {e}"),
                }
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        classify(status, text, |payload| {
            payload["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_owned)
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini — primary provider, single key, single model, no rotation
// ────────────────────────────────────────────────────────────────────────────

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The primary model. Intentionally hardcoded — the fallback chain is a Groq
/// concern, the primary has exactly one model.
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiTransport {
    client: Client,
}

impl GeminiTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatTransport for GeminiTransport {
    async fn send(&self, model: &str, api_key: &str, messages: &[ChatMessage]) -> CallOutcome {
        let system_text = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                json!({
                    "role": if m.role == "assistant" { "model" } else { "user" },
                    "parts": [ { "text": m.content } ],
                })
            })
            .collect();

        let body = json!({
            "system_instruction": { "parts": [ { "text": system_text } ] },
            "contents": contents,
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": TEMPERATURE,
            },
        });

        let url = format!("{GEMINI_API_BASE}/{model}:generateContent");
        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return CallOutcome::Failed {
                    message: format!("Gemini request failed: {e}"),
                }
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        classify(status, text, |payload| {
            payload["candidates"][0]["content"]["parts"][0]["text"]
                .as_str()
                .map(str::to_owned)
        })
    }
}

/// Maps an HTTP status + body to a `CallOutcome`, extracting the completion
/// text from a 2xx envelope with the provider-specific accessor.
fn classify(
    status: StatusCode,
    text: String,
    extract: impl Fn(&Value) -> Option<String>,
) -> CallOutcome {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return CallOutcome::RateLimited {
            status: status.as_u16(),
            message: text,
        };
    }
    if !status.is_success() {
        return CallOutcome::Failed {
            message: format!("provider error {status}: {text}"),
        };
    }

    // Missing content in a 2xx envelope degrades to an empty completion,
    // which the sanitizer then rejects as a parse failure.
    let content = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|payload| extract(&payload))
        .unwrap_or_default();

    debug!(status = status.as_u16(), chars = content.len(), "provider call ok");
    CallOutcome::Success(content)
}
