//! Error types for the security gateway.

use authn_delegate_sdk::AuthnDelegateError;
use thiserror::Error;

/// The trusted header was required but not present.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("pre-authentication header '{header}' not found in request")]
pub struct HeaderMissingError {
    pub header: String,
}

/// Per-request authentication failure produced by the pre-auth filter.
///
/// Never propagated to the transport layer: the filter stores it in request
/// extensions and the decision stage turns it into a status code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreAuthError {
    #[error(transparent)]
    HeaderMissing(#[from] HeaderMissingError),

    #[error("delegate lookup failed for '{principal}': {source}")]
    DelegateLookup {
        principal: String,
        #[source]
        source: AuthnDelegateError,
    },
}

impl PreAuthError {
    /// Whether the failure comes from the delegate's infrastructure rather than the principal.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        match self {
            Self::HeaderMissing(_) => false,
            Self::DelegateLookup { source, .. } => !source.is_lookup_failure(),
        }
    }
}

/// Fatal startup error: the chain must not serve requests.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("pre-authentication is disabled but an authentication filter was requested")]
    PreAuthDisabled,

    #[error("pre-authentication is disabled but the cookie CSRF repository was requested")]
    CsrfRepositoryDisabled,

    #[error("invalid header name '{name}': {reason}")]
    InvalidHeaderName { name: String, reason: String },

    #[error("invalid Content-Security-Policy value: {0}")]
    InvalidCspPolicy(String),

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },

    #[error("invalid path '{path}': must start with '/'")]
    InvalidPath { path: String },

    #[error("invalid CORS configuration: {0}")]
    InvalidCors(String),
}
