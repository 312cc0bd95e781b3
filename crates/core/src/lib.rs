//! # AYMARA Core
//!
//! Domain types, traits, and error definitions for the AYMARA assistant
//! gateway. This crate has **no framework dependencies**: it defines the
//! model that the other crates implement against.
//!
//! The model-client boundary is the [`Provider`] trait; the caller key is
//! [`Identity`]; user-visible failures are [`ConsultError`].

pub mod error;
pub mod identity;
pub mod message;
pub mod persona;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{BackendFailure, ConsultError, Error, ProviderError, Result};
pub use identity::Identity;
pub use message::{Message, Role};
pub use persona::{Persona, PersonaSource};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
