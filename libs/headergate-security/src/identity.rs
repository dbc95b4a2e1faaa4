use std::collections::BTreeSet;

use thiserror::Error;

/// Errors raised while constructing an [`AuthenticatedIdentity`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The principal name was empty or whitespace only.
    #[error("principal name must not be empty")]
    EmptyPrincipal,
}

/// How an identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationSource {
    /// Asserted by an upstream component (reverse proxy / SSO agent) via a request header.
    PreAuthenticated,
}

/// An identity resolved by the authentication delegate.
///
/// The principal is guaranteed to be non-empty. Authorities are opaque labels
/// kept in a sorted set so equality and serialization are stable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuthenticatedIdentity {
    principal: String,
    authorities: BTreeSet<String>,
    source: AuthenticationSource,
}

impl AuthenticatedIdentity {
    /// Build a pre-authenticated identity.
    ///
    /// # Errors
    /// Returns [`IdentityError::EmptyPrincipal`] if `principal` is blank.
    pub fn pre_authenticated<I, A>(
        principal: impl Into<String>,
        authorities: I,
    ) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let principal = principal.into();
        if principal.trim().is_empty() {
            return Err(IdentityError::EmptyPrincipal);
        }

        Ok(Self {
            principal,
            authorities: authorities.into_iter().map(Into::into).collect(),
            source: AuthenticationSource::PreAuthenticated,
        })
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    #[must_use]
    pub fn source(&self) -> AuthenticationSource {
        self.source
    }

    /// Whether the identity holds the given authority.
    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Whether the identity holds at least one of `authorities`.
    #[must_use]
    pub fn has_any_authority<S: AsRef<str>>(&self, authorities: &[S]) -> bool {
        authorities.iter().any(|a| self.has_authority(a.as_ref()))
    }
}
