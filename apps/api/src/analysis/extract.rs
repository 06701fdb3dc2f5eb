//! Uploaded-file text extraction for `/upload-analyze`.
//!
//! PDF via `pdf-extract`, plain text as UTF-8. DOCX is rejected: no
//! dependable extraction path, and the typed-text flow covers those users.

use crate::errors::AppError;

/// Pulls analyzable text out of an uploaded file, routed by content type
/// first and file extension as a fallback.
pub fn extract_text(
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<String, AppError> {
    let lower_name = filename.to_lowercase();
    let content_type = content_type.unwrap_or_default();

    if content_type.contains("pdf") || lower_name.ends_with(".pdf") {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?;
        return Ok(text.trim().to_string());
    }

    if content_type.starts_with("text/") || lower_name.ends_with(".txt") {
        return Ok(String::from_utf8_lossy(data).trim().to_string());
    }

    Err(AppError::Validation(
        "Unsupported file type. Use PDF or TXT.".to_string(),
    ))
}
