//! `AuthenticationDelegate` implementation for the static delegate.

use async_trait::async_trait;
use authn_delegate_sdk::{AuthenticationDelegate, AuthnDelegateError};
use headergate_security::AuthenticatedIdentity;

use super::service::Service;

#[async_trait]
impl AuthenticationDelegate for Service {
    async fn load_identity(
        &self,
        principal: &str,
    ) -> Result<AuthenticatedIdentity, AuthnDelegateError> {
        self.resolve(principal).inspect_err(|e| {
            tracing::debug!(principal, error = %e, "static delegate rejected principal");
        })
    }
}
