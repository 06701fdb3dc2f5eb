//! Groq dispatch — walks the (model × key) attempt plan until one call lands.
//!
//! Rate limits are typically per-key-per-model, so the plan exhausts every
//! key for the preferred model before degrading to the next model in the
//! chain. The attempt plan is a flattened iteration over model index × key
//! slot rather than literal nested loops; the key for each attempt is drawn
//! from the shared rotator at attempt time, so switching models does NOT
//! reset which key comes next.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::rotation::KeyRotator;
use crate::ai::sanitize::sanitize;
use crate::ai::transport::{CallOutcome, ChatMessage, ChatTransport};
use crate::ai::AiError;

/// Head of the model chain unless overridden via `GROQ_MODEL`.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Fixed built-in fallback chain, tried after the preferred model.
pub const FALLBACK_MODELS: &[&str] = &["llama-3.1-8b-instant", "gemma2-9b-it"];

/// Builds the ordered model chain: preferred model first, then the built-in
/// fallbacks (minus a duplicate of the preferred name).
pub fn model_chain(preferred: Option<&str>) -> Vec<String> {
    let head = preferred.unwrap_or(DEFAULT_MODEL);
    let mut chain = vec![head.to_string()];
    chain.extend(
        FALLBACK_MODELS
            .iter()
            .filter(|m| **m != head)
            .map(|m| m.to_string()),
    );
    chain
}

/// Dispatches one request across the model chain and key pool.
pub struct GroqDispatcher {
    transport: Arc<dyn ChatTransport>,
    models: Vec<String>,
    keys: Arc<KeyRotator>,
}

impl GroqDispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>, models: Vec<String>, keys: Arc<KeyRotator>) -> Self {
        Self {
            transport,
            models,
            keys,
        }
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Attempts every (model, key) pair in plan order and returns the first
    /// sanitized payload.
    ///
    /// A transport success whose body fails to parse is terminal: a working
    /// key returning garbage will not improve by trying another key. Rate
    /// limits and other per-attempt failures both advance the rotation; they
    /// are only logged differently.
    pub async fn dispatch(&self, messages: &[ChatMessage]) -> Result<Value, AiError> {
        if self.keys.is_empty() {
            return Err(AiError::NoCredentials);
        }

        let slots = self.keys.len();
        let plan = self
            .models
            .iter()
            .flat_map(|model| (0..slots).map(move |slot| (model, slot)));

        let mut attempts: u32 = 0;
        for (model, slot) in plan {
            let key = self.keys.next()?;
            attempts += 1;
            match self.transport.send(model, key, messages).await {
                CallOutcome::Success(body) => {
                    debug!(model = %model, attempts, "Groq call succeeded");
                    return sanitize(&body);
                }
                CallOutcome::RateLimited { status, .. } => {
                    warn!(model = %model, slot, status, "Groq key rate-limited, rotating");
                }
                CallOutcome::Failed { message } => {
                    warn!(model = %model, slot, error = %message, "Groq call failed, rotating");
                }
            }
        }

        warn!(attempts, "every (model, key) combination exhausted");
        Err(AiError::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted transport: pops one outcome per call, records (model, key)
    /// order, and counts attempts. Runs dry into `Failed`.
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<CallOutcome>>,
        calls: AtomicU32,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<CallOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen(&self) -> Vec<(String, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(
            &self,
            model: &str,
            api_key: &str,
            _messages: &[ChatMessage],
        ) -> CallOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), api_key.to_string()));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(CallOutcome::Failed {
                    message: "script exhausted".to_string(),
                })
        }
    }

    fn rate_limited() -> CallOutcome {
        CallOutcome::RateLimited {
            status: 429,
            message: "too many requests".to_string(),
        }
    }

    fn dispatcher(transport: Arc<ScriptedTransport>, models: &[&str], keys: &[&str]) -> GroqDispatcher {
        GroqDispatcher::new(
            transport,
            models.iter().map(|m| m.to_string()).collect(),
            Arc::new(KeyRotator::new(keys.iter().map(|k| k.to_string()).collect())),
        )
    }

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("judge resumes"),
            ChatMessage::user("resume text"),
        ]
    }

    #[tokio::test]
    async fn test_first_attempt_success_short_circuits() {
        let transport =
            ScriptedTransport::new(vec![CallOutcome::Success("{\"score\": 80}".to_string())]);
        let d = dispatcher(Arc::clone(&transport), &["m1", "m2"], &["k1", "k2"]);

        let value = d.dispatch(&messages()).await.unwrap();
        assert_eq!(value["score"], 80);
        assert_eq!(transport.calls(), 1);
    }

    /// 2 models × 2 keys, first model rate-limited on both keys, second model
    /// succeeds on its first attempt: exactly 3 calls, never the fourth.
    #[tokio::test]
    async fn test_key_exhaustion_falls_through_to_next_model() {
        let transport = ScriptedTransport::new(vec![
            rate_limited(),
            rate_limited(),
            CallOutcome::Success("{\"score\": 55}".to_string()),
        ]);
        let d = dispatcher(Arc::clone(&transport), &["m1", "m2"], &["k1", "k2"]);

        let value = d.dispatch(&messages()).await.unwrap();
        assert_eq!(value["score"], 55);
        assert_eq!(transport.calls(), 3);

        let seen = transport.seen();
        assert_eq!(seen[0], ("m1".to_string(), "k1".to_string()));
        assert_eq!(seen[1], ("m1".to_string(), "k2".to_string()));
        // The rotator cursor wrapped, so the second model starts back at k1.
        assert_eq!(seen[2], ("m2".to_string(), "k1".to_string()));
    }

    #[tokio::test]
    async fn test_all_combinations_rate_limited_exhausts() {
        let transport = ScriptedTransport::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]);
        let d = dispatcher(Arc::clone(&transport), &["m1", "m2"], &["k1", "k2"]);

        let err = d.dispatch(&messages()).await.unwrap_err();
        assert!(matches!(err, AiError::Exhausted { attempts: 4 }));
        assert_eq!(transport.calls(), 4);
    }

    /// Non-rate-limit failures advance the rotation exactly like rate limits.
    #[tokio::test]
    async fn test_generic_failure_rotates_like_rate_limit() {
        let transport = ScriptedTransport::new(vec![
            CallOutcome::Failed {
                message: "connection reset".to_string(),
            },
            CallOutcome::Success("{\"ok\": true}".to_string()),
        ]);
        let d = dispatcher(Arc::clone(&transport), &["m1"], &["k1", "k2"]);

        let value = d.dispatch(&messages()).await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.seen()[1].1, "k2");
    }

    /// A transport success with an unparsable body is terminal — no further
    /// rotation, because another key will not fix malformed output.
    #[tokio::test]
    async fn test_unparsable_body_is_terminal_not_retried() {
        let transport = ScriptedTransport::new(vec![CallOutcome::Success(
            "definitely not json".to_string(),
        )]);
        let d = dispatcher(Arc::clone(&transport), &["m1", "m2"], &["k1", "k2"]);

        let err = d.dispatch(&messages()).await.unwrap_err();
        assert!(matches!(err, AiError::Parse { .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_key_pool_fails_without_network() {
        let transport = ScriptedTransport::new(vec![]);
        let d = dispatcher(Arc::clone(&transport), &["m1"], &[]);

        let err = d.dispatch(&messages()).await.unwrap_err();
        assert!(matches!(err, AiError::NoCredentials));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_model_chain_default() {
        let chain = model_chain(None);
        assert_eq!(
            chain,
            vec![
                "llama-3.3-70b-versatile",
                "llama-3.1-8b-instant",
                "gemma2-9b-it"
            ]
        );
    }

    #[test]
    fn test_model_chain_with_override() {
        let chain = model_chain(Some("mixtral-8x7b-32768"));
        assert_eq!(chain[0], "mixtral-8x7b-32768");
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_model_chain_deduplicates_preferred() {
        let chain = model_chain(Some("llama-3.1-8b-instant"));
        assert_eq!(chain, vec!["llama-3.1-8b-instant", "gemma2-9b-it"]);
    }
}
