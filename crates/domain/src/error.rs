//! Domain error types.
//!
//! Three families: invariant violations (bugs or data-consistency breaks,
//! never recoverable locally), functional outcomes (business rules meant to
//! reach an end user as a readable message), and integration failures from
//! external collaborators.

use thiserror::Error;

/// Failure calling an external collaborator.
#[derive(Debug, Clone, Error)]
#[error("integration failure in {service}: {message}")]
pub struct IntegrationError {
    pub service: &'static str,
    pub message: String,
}

impl IntegrationError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

/// Failure in the request store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A request with the same case reference, employer and dates already
    /// exists. Raised by the store's uniqueness constraint, which turns the
    /// read-then-create race into a conflict instead of a silent duplicate.
    #[error("request already exists for this case, employer and dates")]
    Duplicate,

    #[error("request not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Backend(String),
}

/// Error surfaced by lifecycle and income operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Invariant violation. Indicates a bug or a consistency break with the
    /// upstream case system, not a user error.
    #[error("[{code}] {message}")]
    Invariant { code: &'static str, message: String },

    /// Business-rule outcome intended for an end user.
    #[error("[{code}] {message}")]
    Functional { code: &'static str, message: String },

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn invariant(code: &'static str, message: impl Into<String>) -> Self {
        Self::Invariant {
            code,
            message: message.into(),
        }
    }

    pub fn functional(code: &'static str, message: impl Into<String>) -> Self {
        Self::Functional {
            code,
            message: message.into(),
        }
    }

    /// Whether this error carries a message meant for an end user.
    pub fn is_functional(&self) -> bool {
        matches!(self, Self::Functional { .. })
    }

    /// Internal code for logs and generic error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invariant { code, .. } | Self::Functional { code, .. } => *code,
            Self::Integration(_) => "INTEGRATION_FAILURE",
            Self::Store(StoreError::Duplicate) => "DUPLICATE_REQUEST",
            Self::Store(_) => "STORE_FAILURE",
        }
    }
}
