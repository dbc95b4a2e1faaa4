//! Service implementation for the static authentication delegate.

use std::collections::HashMap;

use authn_delegate_sdk::AuthnDelegateError;
use headergate_security::AuthenticatedIdentity;

use crate::config::{DelegateMode, StaticAuthnDelegateConfig};

/// Static principal lookup.
///
/// - `accept_all`: any non-empty principal gets the default authorities
/// - `static_users`: only configured principals are known
#[derive(Debug)]
pub struct Service {
    mode: DelegateMode,
    default_authorities: Vec<String>,
    users: HashMap<String, KnownUser>,
}

#[derive(Debug, Clone)]
struct KnownUser {
    authorities: Vec<String>,
    disabled: bool,
}

impl Service {
    /// Create a service from delegate configuration.
    #[must_use]
    pub fn from_config(cfg: &StaticAuthnDelegateConfig) -> Self {
        let users = cfg
            .users
            .iter()
            .map(|u| {
                let authorities = u
                    .authorities
                    .clone()
                    .unwrap_or_else(|| cfg.default_authorities.clone());
                (
                    u.principal.clone(),
                    KnownUser {
                        authorities,
                        disabled: u.disabled,
                    },
                )
            })
            .collect();

        Self {
            mode: cfg.mode,
            default_authorities: cfg.default_authorities.clone(),
            users,
        }
    }

    /// Resolve a principal into an identity.
    ///
    /// # Errors
    /// Returns `Unauthorized` for blank, unknown (in `static_users` mode) or disabled principals.
    pub fn resolve(&self, principal: &str) -> Result<AuthenticatedIdentity, AuthnDelegateError> {
        if principal.trim().is_empty() {
            return Err(AuthnDelegateError::Unauthorized(
                "empty principal".to_owned(),
            ));
        }

        let authorities = match (self.mode, self.users.get(principal)) {
            (_, Some(user)) if user.disabled => {
                return Err(AuthnDelegateError::Unauthorized(format!(
                    "principal '{principal}' is disabled"
                )));
            }
            (_, Some(user)) => user.authorities.clone(),
            (DelegateMode::AcceptAll, None) => self.default_authorities.clone(),
            (DelegateMode::StaticUsers, None) => {
                return Err(AuthnDelegateError::Unauthorized(format!(
                    "unknown principal '{principal}'"
                )));
            }
        };

        AuthenticatedIdentity::pre_authenticated(principal, authorities)
            .map_err(|e| AuthnDelegateError::Internal(e.to_string()))
    }
}
