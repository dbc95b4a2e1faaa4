//! Pre-authentication state machine.
//!
//! A session is either `UNAUTHENTICATED` (empty [`SecurityContext`]) or
//! `AUTHENTICATED(p)`. For every request the filter first decides a
//! [`Transition`] from the current state and the extracted header, without side
//! effects, and then applies it. Applying is the only place the delegate is called.
//!
//! | state              | header        | transition                                   |
//! |--------------------|---------------|----------------------------------------------|
//! | any                | strict miss   | clear context, fail request                  |
//! | `UNAUTHENTICATED`  | absent        | keep                                         |
//! | `AUTHENTICATED(p)` | absent        | keep (identity persists)                     |
//! | `UNAUTHENTICATED`  | `p'`          | look up `p'`                                 |
//! | `AUTHENTICATED(p)` | `p`           | keep, no lookup                              |
//! | `AUTHENTICATED(p)` | `p' != p`     | clear, look up `p'` (keep `p` if change checks are off) |

use std::sync::Arc;
use std::time::Duration;

use authn_delegate_sdk::{AuthenticationDelegate, AuthnDelegateError};
use axum::http::{HeaderMap, HeaderName};
use headergate_security::{AuthenticatedIdentity, SecurityContext};

use crate::config::SecurityGatewayConfig;
use crate::error::{ConfigurationError, HeaderMissingError, PreAuthError};
use crate::extractor::HeaderIdentityExtractor;

/// What the filter will do for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Leave the context as it is.
    Keep,
    /// Resolve `principal` through the delegate. `replaces` is the principal
    /// being dropped because the header changed.
    Authenticate {
        principal: String,
        replaces: Option<String>,
    },
    /// The header was required but missing: clear the context and fail the request.
    Invalidate(HeaderMissingError),
}

/// Result of applying a transition.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// An identity was dropped because another principal was asserted.
    pub principal_changed: bool,
    /// Authentication failure for this request only.
    pub failure: Option<PreAuthError>,
}

/// Header pre-authentication filter.
pub struct PreAuthFilter {
    extractor: HeaderIdentityExtractor,
    delegate: Arc<dyn AuthenticationDelegate>,
    check_for_principal_changes: bool,
    delegate_timeout: Option<Duration>,
}

impl std::fmt::Debug for PreAuthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreAuthFilter")
            .field("extractor", &self.extractor)
            .field("check_for_principal_changes", &self.check_for_principal_changes)
            .field("delegate_timeout", &self.delegate_timeout)
            .finish_non_exhaustive()
    }
}

impl PreAuthFilter {
    /// Build the filter from configuration.
    ///
    /// # Errors
    /// - [`ConfigurationError::PreAuthDisabled`] when `enabled` is false
    /// - [`ConfigurationError::InvalidHeaderName`] when `header_name` is not a valid header name
    pub fn from_config(
        cfg: &SecurityGatewayConfig,
        delegate: Arc<dyn AuthenticationDelegate>,
    ) -> Result<Self, ConfigurationError> {
        if !cfg.enabled {
            return Err(ConfigurationError::PreAuthDisabled);
        }

        let header = HeaderName::from_bytes(cfg.header_name.trim().as_bytes()).map_err(|e| {
            ConfigurationError::InvalidHeaderName {
                name: cfg.header_name.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            extractor: HeaderIdentityExtractor::new(header, cfg.fail_on_missing_header),
            delegate,
            check_for_principal_changes: cfg.check_for_principal_changes,
            delegate_timeout: cfg.delegate_timeout_ms.map(Duration::from_millis),
        })
    }

    #[must_use]
    pub fn extractor(&self) -> &HeaderIdentityExtractor {
        &self.extractor
    }

    /// Decide the transition for the current state and extraction result.
    #[must_use]
    pub fn plan(
        &self,
        ctx: &SecurityContext,
        asserted: Result<Option<String>, HeaderMissingError>,
    ) -> Transition {
        let principal = match asserted {
            Ok(Some(principal)) => principal,
            Ok(None) => return Transition::Keep,
            Err(missing) => return Transition::Invalidate(missing),
        };

        match ctx.principal() {
            None => Transition::Authenticate {
                principal,
                replaces: None,
            },
            Some(current) if current == principal || !self.check_for_principal_changes => {
                Transition::Keep
            }
            Some(current) => Transition::Authenticate {
                principal,
                replaces: Some(current.to_owned()),
            },
        }
    }

    /// Apply `transition` to `ctx`.
    pub async fn apply(&self, ctx: &mut SecurityContext, transition: Transition) -> FilterOutcome {
        match transition {
            Transition::Keep => FilterOutcome::default(),
            Transition::Invalidate(missing) => {
                if let Some(previous) = ctx.clear() {
                    tracing::debug!(
                        principal = previous.principal(),
                        "Cleared security context - no principal header found in the request"
                    );
                }
                FilterOutcome {
                    principal_changed: false,
                    failure: Some(missing.into()),
                }
            }
            Transition::Authenticate {
                principal,
                replaces,
            } => {
                let principal_changed = replaces.is_some();
                if let Some(previous) = replaces {
                    tracing::debug!(
                        previous = %previous,
                        current = %principal,
                        "Pre-authenticated principal changed; clearing security context"
                    );
                    ctx.clear();
                }

                match self.lookup(&principal).await {
                    Ok(identity) => {
                        tracing::debug!(principal = %principal, "Pre-authenticated principal accepted");
                        ctx.set_identity(identity);
                        FilterOutcome {
                            principal_changed,
                            failure: None,
                        }
                    }
                    Err(source) => {
                        log_lookup_error(&principal, &source);
                        ctx.clear();
                        FilterOutcome {
                            principal_changed,
                            failure: Some(PreAuthError::DelegateLookup { principal, source }),
                        }
                    }
                }
            }
        }
    }

    /// Extract, plan and apply in one go.
    pub async fn process(&self, ctx: &mut SecurityContext, headers: &HeaderMap) -> FilterOutcome {
        let transition = self.plan(ctx, self.extractor.extract(headers));
        self.apply(ctx, transition).await
    }

    async fn lookup(&self, principal: &str) -> Result<AuthenticatedIdentity, AuthnDelegateError> {
        let lookup = self.delegate.load_identity(principal);
        match self.delegate_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup).await.unwrap_or_else(|_| {
                Err(AuthnDelegateError::ServiceUnavailable(format!(
                    "lookup timed out after {} ms",
                    limit.as_millis()
                )))
            }),
            None => lookup.await,
        }
    }
}

/// Log delegate failures at appropriate levels.
///
/// Cognitive complexity is inflated by tracing macro expansion.
#[allow(clippy::cognitive_complexity)]
fn log_lookup_error(principal: &str, err: &AuthnDelegateError) {
    match err {
        AuthnDelegateError::Unauthorized(msg) => {
            tracing::debug!(principal, "Delegate rejected principal: {msg}");
        }
        AuthnDelegateError::ServiceUnavailable(msg) => {
            tracing::error!(principal, "Authentication delegate unavailable: {msg}");
        }
        AuthnDelegateError::Internal(msg) => {
            tracing::error!(principal, "Authentication delegate internal error: {msg}");
        }
    }
}
