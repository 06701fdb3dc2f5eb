//! Normalizes a raw model completion into parsed JSON.
//!
//! The prompt instructs the model to emit single-line JSON with no markdown,
//! but completions still arrive wrapped in code fences, split across lines,
//! or padded with prose. Recovery order: strip fences, collapse whitespace,
//! parse; failing that, parse the greedy first-`{`-to-last-`}` substring.
//!
//! No semantic validation happens here — a payload that parses but has the
//! wrong keys is the caller's problem.

use serde_json::Value;

use crate::ai::AiError;

/// Recovers a JSON value from raw completion text, or fails with
/// `AiError::Parse` carrying the original text for diagnostics.
pub fn sanitize(raw: &str) -> Result<Value, AiError> {
    let cleaned = collapse_whitespace(&strip_fences(raw));

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    // Leading/trailing prose around a balanced object: take the outermost
    // brace-to-brace substring and try once more.
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            let braced = collapse_whitespace(&cleaned[start..=end]);
            if let Ok(value) = serde_json::from_str::<Value>(&braced) {
                return Ok(value);
            }
        }
    }

    Err(AiError::Parse {
        raw: raw.to_string(),
    })
}

/// Removes markdown code-fence markers (with or without a language tag)
/// anywhere in the text.
fn strip_fences(text: &str) -> String {
    text.replace("```json", " ").replace("```", " ")
}

/// Collapses every whitespace run (including newlines) into a single space
/// and trims the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_plain_json() {
        let value = sanitize(r#"{"a":1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_sanitize_strips_json_fences() {
        let value = sanitize("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_sanitize_strips_bare_fences() {
        let value = sanitize("```\n{\"score\": 42}\n```").unwrap();
        assert_eq!(value, json!({"score": 42}));
    }

    #[test]
    fn test_sanitize_collapses_multiline_json() {
        let raw = "{\n  \"a\": 1,\n  \"b\": [\n    2,\n    3\n  ]\n}";
        let value = sanitize(raw).unwrap();
        assert_eq!(value, json!({"a": 1, "b": [2, 3]}));
    }

    #[test]
    fn test_sanitize_extracts_object_from_leading_prose() {
        let raw = "Here is your analysis: {\"score\": 73, \"label\": \"Startup-Ready\"} hope it helps!";
        let value = sanitize(raw).unwrap();
        assert_eq!(value["score"], 73);
        assert_eq!(value["label"], "Startup-Ready");
    }

    #[test]
    fn test_sanitize_extracts_object_from_fenced_prose() {
        let raw = "Sure! ```json\n{\"a\": \"b\"}\n``` Let me know if you need more.";
        let value = sanitize(raw).unwrap();
        assert_eq!(value, json!({"a": "b"}));
    }

    #[test]
    fn test_sanitize_fails_without_braces() {
        let err = sanitize("the model refused to answer").unwrap_err();
        match err {
            AiError::Parse { raw } => assert!(raw.contains("refused")),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_sanitize_fails_on_unbalanced_garbage() {
        assert!(matches!(
            sanitize("{\"a\": oops"),
            Err(AiError::Parse { .. })
        ));
    }

    #[test]
    fn test_sanitize_preserves_original_text_in_error() {
        let raw = "```json\ntotal nonsense\n```";
        match sanitize(raw).unwrap_err() {
            AiError::Parse { raw: kept } => assert_eq!(kept, raw),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    /// Whitespace collapse applies inside string values too — the model is
    /// told to produce single-line output, so embedded newlines are noise.
    #[test]
    fn test_sanitize_collapses_whitespace_inside_strings() {
        let value = sanitize("{\"overview\": \"line one\nline two\"}").unwrap();
        assert_eq!(value["overview"], "line one line two");
    }
}
