//! Structured request events
//!
//! Events carry a `data` object. Keys that look like credentials are
//! replaced before anything reaches the log.

use serde_json::{Map, Value};
use tracing::{error, info};

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEY_PARTS: [&str; 4] = ["token", "key", "authorization", "secret"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Error,
}

/// Whether `key` names a credential (case-insensitive substring match)
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEY_PARTS.iter().any(|part| key.contains(part))
}

/// Replace the values of sensitive top-level keys. Non-objects pass through.
pub fn redact(data: Value) -> Value {
    let Value::Object(map) = data else {
        return data;
    };

    let redacted: Map<String, Value> = map
        .into_iter()
        .map(|(key, value)| {
            if is_sensitive_key(&key) {
                (key, Value::String(REDACTED.to_string()))
            } else {
                (key, value)
            }
        })
        .collect();
    Value::Object(redacted)
}

/// Emit `event` with its redacted `data` at `level`
pub fn log_event(level: EventLevel, event: &str, data: Value) {
    let data = redact(data);
    match level {
        EventLevel::Info => info!(event, data = %data, "{}", event),
        EventLevel::Error => error!(event, data = %data, "{}", event),
    }
}
