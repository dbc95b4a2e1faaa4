//! Lookup trait for authentication delegates.
//!
//! The pre-authentication filter calls this trait once per newly asserted
//! principal. Implementations look up the principal's authorities in a user
//! directory; they never verify credentials, the upstream proxy already did.

use async_trait::async_trait;
use headergate_security::AuthenticatedIdentity;

use crate::error::AuthnDelegateError;

/// Resolves a pre-authenticated principal name into an identity.
///
/// ```ignore
/// let delegate: Arc<dyn AuthenticationDelegate> = Arc::new(StaticAuthnDelegate::from_config(&cfg));
/// let identity = delegate.load_identity("alice").await?;
/// ```
///
/// Calls are treated as blocking lookups: the filter does not retry them and
/// surfaces a failure for the current request immediately.
#[async_trait]
pub trait AuthenticationDelegate: Send + Sync {
    /// Resolve `principal` into an authenticated identity.
    ///
    /// # Arguments
    ///
    /// * `principal` - The trimmed, non-empty value of the trusted header
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the principal is unknown or not allowed to sign in
    /// - `ServiceUnavailable` if the backing directory cannot be reached
    /// - `Internal` for unexpected errors
    async fn load_identity(
        &self,
        principal: &str,
    ) -> Result<AuthenticatedIdentity, AuthnDelegateError>;
}
