//! Axum route handlers for the analysis API.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::ai::AiError;
use crate::analysis::extract::extract_text;
use crate::analysis::prompts::{build_user_prompt, ANALYSIS_SYSTEM_PROMPT};
use crate::analysis::{degraded_fallback, validate_resume_text, MIN_RESUME_CHARS};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_text: String,
    pub job_description: Option<String>,
}

/// POST /analyze
///
/// Body: `{"resumeText": "...", "jobDescription": "..."?}`. Returns the
/// model's payload with `sourceText` merged in, or the degraded fallback
/// payload under a 500 when every provider avenue fails.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Response, AppError> {
    validate_resume_text(&request.resume_text)?;
    run_analysis(&state, request.resume_text, request.job_description).await
}

/// POST /upload-analyze
///
/// Multipart upload: `file` (PDF or TXT, 10 MB cap) plus an optional
/// `jobDescription` text field. Extracts the document text, then follows the
/// same path as /analyze.
pub async fn handle_upload_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
                file = Some((filename, content_type, data));
            }
            Some("jobDescription") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read field: {e}")))?;
                job_description = Some(text);
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::Validation("No file uploaded.".to_string()))?;
    info!(filename = %filename, bytes = data.len(), "extracting uploaded resume");

    let resume_text = extract_text(&filename, content_type.as_deref(), &data)?;
    if resume_text.trim().len() < MIN_RESUME_CHARS {
        return Err(AppError::UnprocessableEntity(
            "Could not extract enough text from the file.".to_string(),
        ));
    }

    run_analysis(&state, resume_text, job_description).await
}

/// Shared tail of both endpoints: prompt assembly, the AI call under the
/// aggregate deadline, and terminal-failure degradation.
async fn run_analysis(
    state: &AppState,
    resume_text: String,
    job_description: Option<String>,
) -> Result<Response, AppError> {
    let user_prompt = build_user_prompt(&resume_text, job_description.as_deref());
    let deadline = std::time::Duration::from_secs(state.config.analyze_deadline_secs);

    let outcome = tokio::time::timeout(
        deadline,
        state.ai.analyze(ANALYSIS_SYSTEM_PROMPT, &user_prompt),
    )
    .await;

    match outcome {
        Ok(Ok(mut payload)) => {
            if let Value::Object(map) = &mut payload {
                map.insert("sourceText".to_string(), json!(resume_text));
            }
            Ok(Json(payload).into_response())
        }
        Ok(Err(AiError::Config)) => Err(AppError::Misconfigured(
            "Missing AI credentials: set GEMINI_API_KEY or GROQ_API_KEYS.".to_string(),
        )),
        Ok(Err(e)) => {
            error!("analysis failed: {e}");
            Ok(degraded_response())
        }
        Err(_) => {
            error!(
                deadline_secs = state.config.analyze_deadline_secs,
                "analysis deadline exceeded"
            );
            Ok(degraded_response())
        }
    }
}

fn degraded_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(degraded_fallback())).into_response()
}
