//! Error types for the AYMARA domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` ties them together.

use thiserror::Error;

/// Fixed refusal phrase returned when a question is outside the assistant's scope.
pub const REFUSAL_MESSAGE: &str = "Esta consulta no forma parte de mi campo de conocimiento.";

/// Advisory text for a backend that reported a rate or capacity limit.
pub const HIGH_DEMAND_MESSAGE: &str =
    "El servicio está experimentando alta demanda. Por favor, intenta más tarde.";

/// Advisory text for any other backend failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Ocurrió un error al procesar tu consulta. Por favor, intenta más tarde.";

/// The top-level error type for all AYMARA operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Consult(#[from] ConsultError),

    #[error("Invalid context payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the model client.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether the backend signalled a rate or capacity limit.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::ApiError { status_code: 429, .. }
        )
    }
}

/// Why the model backend could not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    /// The backend reported a rate/capacity condition.
    RateLimited,
    /// Anything else.
    Failure,
}

/// User-visible failures of a consultation.
#[derive(Debug, Clone, Error)]
pub enum ConsultError {
    /// The question failed the admission heuristic. Not retryable.
    #[error("{message}")]
    RejectedQuery { message: String },

    /// The model client failed. Retryable by the caller after a delay.
    #[error("{message}")]
    BackendUnavailable {
        cause: BackendFailure,
        message: String,
    },
}

impl ConsultError {
    pub fn rejected() -> Self {
        ConsultError::RejectedQuery {
            message: REFUSAL_MESSAGE.into(),
        }
    }

    /// Map a provider failure onto the user-facing category.
    pub fn from_provider(err: &ProviderError) -> Self {
        if err.is_capacity() {
            ConsultError::BackendUnavailable {
                cause: BackendFailure::RateLimited,
                message: HIGH_DEMAND_MESSAGE.into(),
            }
        } else {
            ConsultError::BackendUnavailable {
                cause: BackendFailure::Failure,
                message: GENERIC_FAILURE_MESSAGE.into(),
            }
        }
    }

    /// Short class name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsultError::RejectedQuery { .. } => "rejected_query",
            ConsultError::BackendUnavailable { .. } => "backend_unavailable",
        }
    }
}
