//! Medical context handling for AYMARA.
//!
//! A raw context payload is classified once ([`ContextPayload`]), rendered
//! into a text block ([`RenderedContext`]) and kept per caller in a
//! [`ContextStore`] so later questions can reuse it.

pub mod normalize;
pub mod payload;
pub mod render;
pub mod store;
pub mod unwrap;

pub use normalize::normalize;
pub use payload::{ContextPayload, StructuredContext};
pub use render::{LOG_PREVIEW_CHARS, RenderedContext, preview};
pub use store::{Clock, ContextStore, IdentityPolicy, StoredContext, SystemClock};
