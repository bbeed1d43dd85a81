//! Credential detection, redaction and restoration for exported JSON.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Marker written in place of a redacted secret. Never the empty string.
pub const SECRET_PLACEHOLDER: &str = "REPLACE_ME";

fn credential_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(.*api[_-]?key|.*access[_-]?key|.*private[_-]?key|.*secret.*|.*password.*|.*token|authorization)$")
            .expect("credential key pattern is valid")
    })
}

/// Whether an object key names a credential-shaped field.
pub fn is_credential_key(key: &str) -> bool {
    credential_key().is_match(key)
}

pub fn is_placeholder(value: &str) -> bool {
    value == SECRET_PLACEHOLDER
}

/// Replace every non-empty credential-shaped value with [`SECRET_PLACEHOLDER`].
///
/// After masking credential fields, every other occurrence of a masked value
/// inside a string leaf is scrubbed too. Returns the number of distinct
/// secrets masked.
pub fn redact_secrets(value: &mut Value) -> usize {
    let mut masked = BTreeSet::new();
    mask_credentials(value, &mut masked);
    if masked.is_empty() {
        return 0;
    }
    let count = masked.len();
    scrub_leaked(value, &masked);
    count
}

fn mask_credentials(value: &mut Value, masked: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_credential_key(key) {
                    mask_leaves(v, masked);
                } else {
                    mask_credentials(v, masked);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| mask_credentials(v, masked)),
        _ => {}
    }
}

fn mask_leaves(value: &mut Value, masked: &mut BTreeSet<String>) {
    match value {
        Value::String(s) if !s.is_empty() && !is_placeholder(s.as_str()) => {
            masked.insert(std::mem::replace(s, SECRET_PLACEHOLDER.to_string()));
        }
        Value::Object(map) => map.values_mut().for_each(|v| mask_leaves(v, masked)),
        Value::Array(items) => items.iter_mut().for_each(|v| mask_leaves(v, masked)),
        _ => {}
    }
}

fn scrub_leaked(value: &mut Value, masked: &BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for secret in masked {
                if s.contains(secret.as_str()) {
                    *s = s.replace(secret.as_str(), SECRET_PLACEHOLDER);
                }
            }
        }
        Value::Object(map) => map.values_mut().for_each(|v| scrub_leaked(v, masked)),
        Value::Array(items) => items.iter_mut().for_each(|v| scrub_leaked(v, masked)),
        _ => {}
    }
}

/// Put back values from `previous` wherever `current` holds a placeholder at
/// the same path. Paths missing from `previous` keep the placeholder.
pub fn restore_secrets(current: &mut Value, previous: &Value) {
    match (current, previous) {
        (Value::String(s), Value::String(p)) if is_placeholder(s.as_str()) => *s = p.clone(),
        (Value::Object(cur), Value::Object(prev)) => {
            for (key, v) in cur.iter_mut() {
                if let Some(pv) = prev.get(key) {
                    restore_secrets(v, pv);
                }
            }
        }
        (Value::Array(cur), Value::Array(prev)) => {
            for (v, pv) in cur.iter_mut().zip(prev) {
                restore_secrets(v, pv);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_keys() {
        assert!(is_credential_key("apiKey"));
        assert!(is_credential_key("OPENAI_API_KEY"));
        assert!(is_credential_key("secrets"));
        assert!(is_credential_key("db_password"));
        assert!(is_credential_key("accessToken"));
        assert!(is_credential_key("accessKey"));
        assert!(is_credential_key("AWS_ACCESS_KEY"));
        assert!(is_credential_key("private_key"));
        assert!(!is_credential_key("keywords"));
        assert!(!is_credential_key("maxTokens"));
        assert!(!is_credential_key("systemMessage"));
    }

    #[test]
    fn redacts_nested_and_leaked_values() {
        let mut doc = json!({
            "models": [{"apiKey": "sk-live-123", "name": "gpt"}],
            "tool": {"secrets": {"TAVILY": "tv-999"}},
            "note": "copied sk-live-123",
            "echo": "sk-live-123",
            "empty": {"apiKey": ""}
        });
        let n = redact_secrets(&mut doc);
        assert_eq!(n, 2);
        assert_eq!(doc["models"][0]["apiKey"], SECRET_PLACEHOLDER);
        assert_eq!(doc["tool"]["secrets"]["TAVILY"], SECRET_PLACEHOLDER);
        assert_eq!(doc["echo"], SECRET_PLACEHOLDER);
        assert_eq!(doc["note"], "copied REPLACE_ME");
        assert_eq!(doc["empty"]["apiKey"], "");
        assert!(!doc.to_string().contains("tv-999"));
        assert!(!doc.to_string().contains("sk-live-123"));
    }

    #[test]
    fn restores_placeholders_by_path() {
        let previous = json!({"a": {"apiKey": "real"}, "list": [{"token": "t1"}]});
        let mut current = json!({"a": {"apiKey": SECRET_PLACEHOLDER}, "list": [{"token": SECRET_PLACEHOLDER}], "b": SECRET_PLACEHOLDER});
        restore_secrets(&mut current, &previous);
        assert_eq!(current["a"]["apiKey"], "real");
        assert_eq!(current["list"][0]["token"], "t1");
        assert_eq!(current["b"], SECRET_PLACEHOLDER);
    }
}
