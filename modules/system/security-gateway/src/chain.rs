//! Assembly of the security filter chain.
//!
//! Stages are decided once at startup from [`SecurityGatewayConfig`] and the
//! collaborators handed to the builder. Request order, outermost first:
//!
//! management bypass -> trace -> security headers -> CORS -> CSRF -> logout
//! -> pre-authentication -> authorization -> application

use std::sync::Arc;
use std::time::Duration;

use authn_delegate_sdk::AuthenticationDelegate;
use axum::Router;
use axum::extract::Request;
use axum::middleware::from_fn_with_state;
use tower::ServiceExt;
use tower::service_fn;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::config::SecurityGatewayConfig;
use crate::cors::build_cors_layer;
use crate::csrf::{CookieCsrfTokenRepository, CsrfTokenRepository};
use crate::decision::{PermitAll, RouteAccessPolicy, SecurityDecisionPoint};
use crate::error::ConfigurationError;
use crate::middleware::csrf::{CsrfState, csrf_middleware};
use crate::middleware::decision::{DecisionState, decision_middleware};
use crate::middleware::logout::{LogoutState, logout_middleware};
use crate::middleware::preauth::{PreAuthState, preauth_middleware};
use crate::middleware::security_headers::SecurityHeadersLayer;
use crate::preauth::PreAuthFilter;
use crate::session::{SessionCookie, SessionStore};

/// Collects collaborators before the chain is validated and assembled.
#[must_use]
pub struct SecurityChainBuilder {
    config: SecurityGatewayConfig,
    delegate: Option<Arc<dyn AuthenticationDelegate>>,
    csrf_repository: Option<Arc<dyn CsrfTokenRepository>>,
    decision_point: Option<Arc<dyn SecurityDecisionPoint>>,
}

impl SecurityChainBuilder {
    /// Authentication delegate; wiring one installs the pre-authentication stage.
    pub fn delegate(mut self, delegate: Arc<dyn AuthenticationDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Explicit CSRF repository, used instead of the cookie repository.
    pub fn csrf_repository(mut self, repository: Arc<dyn CsrfTokenRepository>) -> Self {
        self.csrf_repository = Some(repository);
        self
    }

    /// Custom decision point, used instead of the configured route policy.
    pub fn decision_point(mut self, decision_point: Arc<dyn SecurityDecisionPoint>) -> Self {
        self.decision_point = Some(decision_point);
        self
    }

    /// Validate the configuration and assemble the chain.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] when a stage cannot be constructed, most
    /// notably when pre-authentication is disabled but a delegate was supplied or
    /// the cookie CSRF repository would be needed.
    pub fn build(self) -> Result<SecurityChain, ConfigurationError> {
        let cfg = self.config;

        if !cfg.logout_path.starts_with('/') {
            return Err(ConfigurationError::InvalidPath {
                path: cfg.logout_path,
            });
        }
        let management_prefix = normalize_prefix(&cfg.management_path_prefix)?;

        let preauth = match self.delegate {
            Some(delegate) => {
                let filter = PreAuthFilter::from_config(&cfg, delegate)?;
                tracing::info!(
                    header = %filter.extractor().header(),
                    fail_on_missing_header = cfg.fail_on_missing_header,
                    check_for_principal_changes = cfg.check_for_principal_changes,
                    "wiring in header pre-authentication"
                );
                Some(PreAuthState {
                    filter: Arc::new(filter),
                    sessions: Arc::new(SessionStore::from_config(&cfg.session)),
                    session_cookie: SessionCookie::from_config(&cfg.session),
                })
            }
            None => {
                tracing::info!("NOT enabling authentication - no authentication delegate configured");
                None
            }
        };

        let csrf_repository = if cfg.csrf_enabled {
            let repository: Arc<dyn CsrfTokenRepository> = match self.csrf_repository {
                Some(repository) => repository,
                None => Arc::new(CookieCsrfTokenRepository::from_config(&cfg)?),
            };
            tracing::info!("wiring in CSRF protection");
            Some(repository)
        } else {
            tracing::info!("CSRF protection disabled");
            None
        };

        let decision_point: Arc<dyn SecurityDecisionPoint> = match (self.decision_point, &preauth) {
            (Some(custom), _) => custom,
            (None, Some(_)) => Arc::new(RouteAccessPolicy::from_config(&cfg)?),
            (None, None) => {
                tracing::info!("no authentication delegate - permitting all requests");
                Arc::new(PermitAll)
            }
        };

        let logout = preauth.as_ref().map(|state| LogoutState {
            path: Arc::from(cfg.logout_path.as_str()),
            post_only: csrf_repository.is_some(),
            sessions: Arc::clone(&state.sessions),
            session_cookie: state.session_cookie.clone(),
            csrf_repository: csrf_repository.clone(),
        });

        let headers = SecurityHeadersLayer::from_config(&cfg)?;
        if !cfg.csp_policy.trim().is_empty() {
            tracing::info!(report_only = cfg.csp_report_only, "wiring in Content-Security-Policy");
        }

        let cors = if cfg.cors_enabled {
            tracing::info!("wiring in CORS");
            Some(build_cors_layer(&cfg.cors.clone().unwrap_or_default())?)
        } else {
            None
        };

        if let Some(prefix) = &management_prefix {
            tracing::info!(prefix = %prefix, "management paths bypass the security chain");
        }

        Ok(SecurityChain {
            management_prefix,
            headers: (!headers.is_empty()).then_some(headers),
            cors,
            csrf: csrf_repository.map(|repository| CsrfState { repository }),
            logout,
            preauth,
            decision: DecisionState { decision_point },
        })
    }
}

/// The assembled chain. Cheap to clone; clones share the session store.
#[derive(Clone)]
pub struct SecurityChain {
    management_prefix: Option<String>,
    headers: Option<SecurityHeadersLayer>,
    cors: Option<CorsLayer>,
    csrf: Option<CsrfState>,
    logout: Option<LogoutState>,
    preauth: Option<PreAuthState>,
    decision: DecisionState,
}

impl SecurityChain {
    pub fn builder(config: SecurityGatewayConfig) -> SecurityChainBuilder {
        SecurityChainBuilder {
            config,
            delegate: None,
            csrf_repository: None,
            decision_point: None,
        }
    }

    /// Whether the pre-authentication stage is installed.
    #[must_use]
    pub fn is_authenticating(&self) -> bool {
        self.preauth.is_some()
    }

    /// Number of live sessions; zero without pre-authentication.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.preauth.as_ref().map_or(0, |p| p.sessions.len())
    }

    /// Wrap `app` in the chain. Requests under the management prefix reach `app` untouched.
    #[must_use]
    pub fn secure(&self, app: Router) -> Router {
        let secured = self.apply_stages(app.clone());
        let Some(prefix) = self.management_prefix.clone() else {
            return secured;
        };

        Router::new().fallback_service(service_fn(move |req: Request| {
            let target = if is_under_prefix(req.uri().path(), &prefix) {
                app.clone()
            } else {
                secured.clone()
            };
            async move { target.oneshot(req).await }
        }))
    }

    fn apply_stages(&self, mut router: Router) -> Router {
        // 7) Authorization (innermost)
        router = router.layer(from_fn_with_state(self.decision.clone(), decision_middleware));

        // 6) Pre-authentication
        if let Some(state) = &self.preauth {
            router = router.layer(from_fn_with_state(state.clone(), preauth_middleware));
        }

        // 5) Logout
        if let Some(state) = &self.logout {
            router = router.layer(from_fn_with_state(state.clone(), logout_middleware));
        }

        // 4) CSRF
        if let Some(state) = &self.csrf {
            router = router.layer(from_fn_with_state(state.clone(), csrf_middleware));
        }

        // 3) CORS (outer to CSRF and auth so OPTIONS preflight short-circuits)
        if let Some(cors) = &self.cors {
            router = router.layer(cors.clone());
        }

        // 2) Security headers (outer so denials carry them too)
        if let Some(headers) = &self.headers {
            router = router.layer(headers.clone());
        }

        // 1) Trace
        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri().path(),
                        version = ?req.version(),
                        module = "security_gateway",
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<axum::body::Body>,
                     latency: Duration,
                     span: &tracing::Span| {
                        span.record("status", res.status().as_u16());
                        span.record("latency_ms", latency.as_millis());
                    },
                ),
        )
    }
}

/// Blank means no bypass; otherwise the prefix must be absolute and loses any trailing `/`.
fn normalize_prefix(prefix: &str) -> Result<Option<String>, ConfigurationError> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Ok(None);
    }
    if !prefix.starts_with('/') {
        return Err(ConfigurationError::InvalidPath {
            path: prefix.to_owned(),
        });
    }
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigurationError::InvalidPath {
            path: prefix.to_owned(),
        });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Segment-aware prefix check: `/admin` covers `/admin` and `/admin/x`, not `/administrator`.
fn is_under_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
