use crate::ai::AiClient;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub ai: AiClient,
    pub config: Config,
}
