//! Best-effort decoding of string-encoded JSON.
//!
//! Clients frequently send the context object serialized into a string,
//! sometimes twice, and sometimes with the escapes but without the outer
//! quotes. At most [`MAX_LAYERS`] decoding steps are attempted.

use serde_json::Value;

/// Maximum number of string-to-JSON decoding steps.
pub const MAX_LAYERS: usize = 2;

/// Decode up to [`MAX_LAYERS`] layers of string-encoded JSON.
///
/// Returns the first non-string value found. When decoding stops on a
/// string (plain text, a parse failure, or more layers than allowed) that
/// string is returned as [`Value::String`].
pub fn decode_layers(raw: &str) -> Value {
    let mut current = raw.trim().to_string();

    for _ in 0..MAX_LAYERS {
        match parse_layer(&current) {
            Some(Value::String(inner)) => current = inner.trim().to_string(),
            Some(value) => return value,
            None => break,
        }
    }

    Value::String(current)
}

fn parse_layer(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    // Escaped JSON that lost its surrounding quotes: {\"a\":1}
    if text.contains("\\\"") {
        return serde_json::from_str::<String>(&format!("\"{text}\""))
            .ok()
            .map(Value::String);
    }

    None
}
