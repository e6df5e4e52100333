//! Raw model output to JSON.

use crate::state::AttemptFailure;
use serde_json::Value;

/// Remove a surrounding Markdown code fence (` ```json ... ``` `), if any
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the info string (`json`, `JSON`, ...) up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse model output into a JSON document
///
/// # Errors
/// Returns `AttemptFailure::MalformedPayload` if the text is empty or not JSON
pub fn parse_payload(raw: &str) -> Result<Value, AttemptFailure> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(AttemptFailure::MalformedPayload("empty response".to_string()));
    }
    serde_json::from_str(text).map_err(|e| AttemptFailure::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        let value = parse_payload(r#"{"confidence": 0.8}"#).unwrap();
        assert_eq!(value, json!({"confidence": 0.8}));
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"flags\": [\"knee_valgus\"]}\n```";
        assert_eq!(strip_code_fences(raw), "{\"flags\": [\"knee_valgus\"]}");
        assert_eq!(parse_payload(raw).unwrap()["flags"][0], "knee_valgus");

        let bare = "```\n[1, 2]\n```\n";
        assert_eq!(parse_payload(bare).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_single_line_fence() {
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_payload("I'm sorry, I cannot analyse this video.").unwrap_err();
        assert!(matches!(err, AttemptFailure::MalformedPayload(_)));

        let err = parse_payload("   ").unwrap_err();
        assert!(matches!(err, AttemptFailure::MalformedPayload(ref m) if m == "empty response"));
    }

    #[test]
    fn test_truncated_payload() {
        assert!(parse_payload(r#"{"match_summary": "Solid"#).is_err());
    }
}
