//! Context rendering: one pure renderer per payload variant.
//!
//! Rendering is deterministic: identical input always yields byte-identical
//! text, and nothing here reads the clock or the environment.

pub mod dynamic;
pub mod fixed;
pub mod format;

use serde::Serialize;
use std::fmt;

use crate::payload::ContextPayload;

/// Characters of context shown in log lines.
pub const LOG_PREVIEW_CHARS: usize = 100;

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A rendered, immutable context block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenderedContext(String);

impl RenderedContext {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// First `max_chars` characters, for log lines.
    pub fn preview(&self, max_chars: usize) -> &str {
        preview(&self.0, max_chars)
    }
}

impl fmt::Display for RenderedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RenderedContext {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render a classified payload.
pub fn render(payload: &ContextPayload) -> RenderedContext {
    let text = match payload {
        ContextPayload::Empty => String::new(),
        ContextPayload::Fixed(ctx) => fixed::render(ctx),
        ContextPayload::Dynamic(map) => dynamic::render(map),
        ContextPayload::Text(text) => text.clone(),
    };
    RenderedContext(text.trim().to_string())
}
