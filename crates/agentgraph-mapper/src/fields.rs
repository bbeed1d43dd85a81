//! Lenient field access over untrusted JSON objects.

use std::str::FromStr;

use agentgraph_core::{Passthrough, ValidationIssue};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Reads typed fields out of one record, recording a `Defaulted` issue for
/// each field that is present but malformed.
pub(crate) struct Fields<'a> {
    subject: &'a str,
    data: &'a Passthrough,
    issues: &'a mut Vec<ValidationIssue>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(
        subject: &'a str,
        data: &'a Passthrough,
        issues: &'a mut Vec<ValidationIssue>,
    ) -> Self {
        Self {
            subject,
            data,
            issues,
        }
    }

    /// First non-null value among `keys`, with the key it was found under.
    pub(crate) fn raw(&self, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
        let data = self.data;
        keys.iter()
            .find_map(|k| data.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)))
    }

    pub(crate) fn get<T: DeserializeOwned>(&mut self, keys: &[&'static str]) -> Option<T> {
        let (key, value) = self.raw(keys)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                self.defaulted(key, &e.to_string());
                None
            }
        }
    }

    pub(crate) fn get_or_default<T: DeserializeOwned + Default>(&mut self, keys: &[&'static str]) -> T {
        self.get(keys).unwrap_or_default()
    }

    /// A string field parsed through `FromStr`.
    pub(crate) fn parse<T: FromStr<Err = String>>(&mut self, keys: &[&'static str]) -> Option<T> {
        let (key, value) = self.raw(keys)?;
        let Some(text) = value.as_str() else {
            self.defaulted(key, "expected a string");
            return None;
        };
        match text.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                self.defaulted(key, &e);
                None
            }
        }
    }

    pub(crate) fn defaulted(&mut self, key: &str, reason: &str) {
        tracing::debug!(subject = self.subject, field = key, reason, "field defaulted");
        self.issues.push(ValidationIssue::defaulted(
            self.subject,
            format!("malformed `{}` replaced by default: {}", key, reason),
        ));
    }

    pub(crate) fn issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

/// Every entry of `data` whose key is not in `known`.
pub(crate) fn extras(data: &Passthrough, known: &[&str]) -> Passthrough {
    data.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// The object behind `value`, or an empty one.
pub(crate) fn object(value: Option<&Value>) -> Passthrough {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Passthrough::new(),
    }
}

pub(crate) fn id_of(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
