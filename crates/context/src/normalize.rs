//! Context normalization: classify once, then render.

use serde_json::Value;

use crate::payload::ContextPayload;
use crate::render::{self, RenderedContext};

/// Turn an optional raw context into its rendered text block.
///
/// Never fails: absent or empty input yields an empty block, and known
/// fields with unusable values are left out of the narrative.
pub fn normalize(raw: Option<&Value>) -> RenderedContext {
    render::render(&ContextPayload::classify(raw))
}
