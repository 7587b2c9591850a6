//! Response normalization.
//!
//! The backend is inconsistent about bodies: resources come bare or wrapped in
//! `{"data": ...}`, successful writes sometimes return no body at all, and
//! errors come as `{"detail": ...}`, as per-field arrays, or as plain text.
//! Everything is normalized here so the rest of the crate sees one shape.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// A payload that may or may not be wrapped in a `data` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Decode a payload into `T`, unwrapping a `data` envelope if present.
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value::<Envelope<T>>(payload)
        .map(Envelope::into_inner)
        .map_err(|e| ApiError::MalformedResponse(format!("unexpected response shape: {}", e)))
}

/// Parse a success body, yielding an empty object when it is absent or not JSON.
pub fn parse_success_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }
    serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Parse an error body, if it is JSON at all.
pub fn parse_error_body(body: &[u8]) -> Option<Value> {
    serde_json::from_slice(body).ok()
}

/// Best-effort user-facing message for a failed response.
///
/// Precedence: a non-empty string body, then a `detail` string, then every
/// field-level message joined with a single space in field order, then
/// `HTTP status N`.
pub fn extract_message(status: u16, body: Option<&Value>) -> String {
    let message = match body {
        Some(Value::String(text)) => Some(text.trim().to_string()),
        Some(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => Some(detail.clone()),
            _ => {
                let mut parts = Vec::new();
                for value in map.values() {
                    flatten_messages(value, &mut parts);
                }
                Some(parts.join(" "))
            }
        },
        Some(Value::Array(items)) => {
            let mut parts = Vec::new();
            for item in items {
                flatten_messages(item, &mut parts);
            }
            Some(parts.join(" "))
        }
        _ => None,
    };

    match message {
        Some(message) if !message.is_empty() => message,
        _ => format!("HTTP status {}", status),
    }
}

fn flatten_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| flatten_messages(item, out)),
        // nested serializer errors
        Value::Object(map) => map.values().for_each(|item| flatten_messages(item, out)),
        Value::Null => {}
        other => out.push(other.to_string()),
    }
}
