//! The AYMARA consultation pipeline.
//!
//! A question goes through three steps:
//!
//! 1. **Admit**: the [`QueryValidator`] heuristic rejects out-of-scope text
//! 2. **Compose**: persona, optional context, then the user question
//! 3. **Ask**: one call to the configured [`aymara_core::Provider`]
//!
//! [`Assistant`] owns the pipeline; it shares the [`aymara_context::ContextStore`]
//! with the gateway so stored context reaches later questions.

pub mod orchestrator;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{Answer, Assistant, ModelSettings, Query, FALLBACK_REPLY};
pub use validator::QueryValidator;
