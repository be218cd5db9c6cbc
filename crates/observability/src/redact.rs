//! Credential redaction for structured log fields.

use serde_json::{Map, Value};

const REDACTED: &str = "[REDACTED]";

/// Substrings that mark a field name as carrying a credential.
const SENSITIVE_KEY_PARTS: [&str; 5] = ["token", "authorization", "cookie", "password", "secret"];

pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_PARTS.iter().any(|part| key.contains(part))
}

/// Redact `value` if `key` names a credential, or if the value itself looks
/// like one. Objects and arrays are walked.
pub fn sanitize_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return redacted();
    }

    match value {
        Value::String(s) if looks_like_credential(s) => redacted(),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_value(k, v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| sanitize_value(key, item)).collect())
        }
        other => other.clone(),
    }
}

fn redacted() -> Value {
    Value::String(REDACTED.to_string())
}

/// Bearer header values and JWT-shaped strings.
fn looks_like_credential(raw: &str) -> bool {
    if raw
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer "))
    {
        return true;
    }
    raw.len() > 40 && raw.split('.').count() == 3 && !raw.contains(char::is_whitespace)
}
