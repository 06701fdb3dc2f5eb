//! Resume analysis domain: request validation, prompt assembly, and the
//! degraded payload returned when every AI avenue fails.

use serde_json::{json, Value};

use crate::errors::AppError;

pub mod extract;
pub mod handlers;
pub mod prompts;

/// Anything shorter than this cannot be meaningfully analyzed.
pub const MIN_RESUME_CHARS: usize = 50;

/// Upload cap for `/upload-analyze`.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn validate_resume_text(text: &str) -> Result<(), AppError> {
    if text.trim().len() < MIN_RESUME_CHARS {
        return Err(AppError::Validation(format!(
            "Resume text is too short. Please provide at least {MIN_RESUME_CHARS} characters."
        )));
    }
    Ok(())
}

/// Fixed renderable payload for terminal AI failures.
///
/// The frontend always needs the analysis shape — score dial, roast cards,
/// improvement list — so a dead provider degrades to this constant instead of
/// a bodyless 5xx. Never derived from partial AI output.
pub fn degraded_fallback() -> Value {
    json!({
        "score": 0,
        "label": "Server Error",
        "description": "The AI is currently overwhelmed or unreachable.",
        "recruiterSnapshot": "I can't even read this right now.",
        "roasts": [
            "Server connection failed",
            "Try again later",
            "Check your internet"
        ],
        "improvements": [
            "Refresh the page",
            "Check API status",
            "Contact support"
        ]
    })
}
