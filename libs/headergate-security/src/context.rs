use crate::identity::AuthenticatedIdentity;

/// `SecurityContext` holds at most one authenticated identity for a session or request.
///
/// The gateway keeps one context per session in its session store and hands a
/// snapshot of it to handlers through request extensions. It is never stored in
/// thread-local or global state.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SecurityContext {
    identity: Option<AuthenticatedIdentity>,
}

impl SecurityContext {
    /// Create an empty (unauthenticated) context.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a context already holding `identity`.
    #[must_use]
    pub fn authenticated(identity: AuthenticatedIdentity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.as_ref()
    }

    /// Principal of the held identity, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.identity.as_ref().map(AuthenticatedIdentity::principal)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Replace the held identity, returning the previous one.
    pub fn set_identity(
        &mut self,
        identity: AuthenticatedIdentity,
    ) -> Option<AuthenticatedIdentity> {
        self.identity.replace(identity)
    }

    /// Drop the held identity, returning it.
    pub fn clear(&mut self) -> Option<AuthenticatedIdentity> {
        self.identity.take()
    }
}
