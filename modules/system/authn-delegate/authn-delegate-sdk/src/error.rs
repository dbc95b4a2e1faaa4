//! Error types for authentication delegates.

use thiserror::Error;

/// Errors that can occur when resolving a principal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthnDelegateError {
    /// The principal is unknown, disabled, or otherwise not allowed in.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backing user directory is not reachable right now.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthnDelegateError {
    /// Whether the failure says something about the principal rather than the infrastructure.
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
