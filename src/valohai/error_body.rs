//! Best-effort extraction of human-readable messages from error bodies.
//!
//! The backend reports failures in several inconsistent shapes. Extraction
//! is attempted in a fixed order:
//!
//! - `{"detail": "...", "code": "..."}`
//! - `{"message": "...", "code": "..."}`
//! - `{"error": "..."}`
//! - `{"non_field_errors": ["..." or {"message": "...", "code": "..."}]}`
//! - `{"errors": [...]}` or a field-keyed map of error arrays
//! - the raw response body

use serde_json::{Map, Value};

/// Fallback text when the response body carries nothing usable.
const NO_DETAILS: &str = "no error details in response";

/// Extracts the best available message from an error response body.
#[must_use]
pub fn extract_message(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body)
        && let Some(message) = from_object(&map)
    {
        return message;
    }

    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        String::from(NO_DETAILS)
    } else {
        raw.to_string()
    }
}

/// Walks the known error shapes in order of preference.
fn from_object(map: &Map<String, Value>) -> Option<String> {
    // detail / message may be paired with a machine-readable code
    for key in ["detail", "message"] {
        if let Some(text) = non_empty_str(map.get(key)) {
            return Some(with_code(map.get("code"), text));
        }
    }

    if let Some(text) = non_empty_str(map.get("error")) {
        return Some(text.to_string());
    }

    if let Some(Value::Array(items)) = map.get("non_field_errors")
        && let Some(message) = from_error_item(items.first())
    {
        return Some(message);
    }

    match map.get("errors") {
        Some(Value::Array(items)) => from_error_item(items.first()),
        Some(Value::Object(fields)) => fields.values().find_map(|value| match value {
            Value::Array(items) => from_error_item(items.first()),
            _ => None,
        }),
        _ => None,
    }
}

/// Decodes one entry of an error array: a plain string or a
/// `{message, code}` object.
fn from_error_item(item: Option<&Value>) -> Option<String> {
    match item? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(object) => {
            let message = non_empty_str(object.get("message")).unwrap_or_default();
            let code = non_empty_str(object.get("code"));
            if message.is_empty() && code.is_none() {
                None
            } else {
                Some(with_code(object.get("code"), message))
            }
        }
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        _ => None,
    }
}

fn with_code(code: Option<&Value>, text: &str) -> String {
    match code {
        Some(Value::String(code)) if !code.is_empty() => format!("({code}) {text}"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_with_code() {
        let body = br#"{"detail": "Invalid token.", "code": "authentication_failed"}"#;
        assert_eq!(
            extract_message(body),
            "(authentication_failed) Invalid token."
        );
    }

    #[test]
    fn test_detail_without_code() {
        let body = br#"{"detail": "Not found."}"#;
        assert_eq!(extract_message(body), "Not found.");
    }

    #[test]
    fn test_message_field() {
        let body = br#"{"message": "name already taken"}"#;
        assert_eq!(extract_message(body), "name already taken");
    }

    #[test]
    fn test_error_field() {
        let body = br#"{"error": "quota exceeded"}"#;
        assert_eq!(extract_message(body), "quota exceeded");
    }

    #[test]
    fn test_non_field_errors_string() {
        let body = br#"{"non_field_errors": ["store name must be unique"]}"#;
        assert_eq!(extract_message(body), "store name must be unique");
    }

    #[test]
    fn test_non_field_errors_object() {
        let body =
            br#"{"non_field_errors": [{"message": "conflicting store", "code": "conflict"}]}"#;
        assert_eq!(extract_message(body), "(conflict) conflicting store");
    }

    #[test]
    fn test_errors_array() {
        let body = br#"{"errors": ["first problem", "second problem"]}"#;
        assert_eq!(extract_message(body), "first problem");
    }

    #[test]
    fn test_errors_field_map() {
        let body = br#"{"errors": {"name": ["too long"]}}"#;
        assert_eq!(extract_message(body), "too long");
    }

    #[test]
    fn test_raw_body_fallback() {
        let body = b"upstream gateway timeout";
        assert_eq!(extract_message(body), "upstream gateway timeout");
    }

    #[test]
    fn test_empty_body_fallback() {
        assert_eq!(extract_message(b""), NO_DETAILS);
    }

    #[test]
    fn test_detail_preferred_over_message() {
        let body = br#"{"detail": "primary", "message": "secondary"}"#;
        assert_eq!(extract_message(body), "primary");
    }
}
