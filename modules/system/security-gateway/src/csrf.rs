//! CSRF token repository.
//!
//! Double-submit scheme: the token lives in a script-readable cookie and
//! state-changing requests must echo it in a request header.

use axum::http::{HeaderMap, HeaderName, Method};
use subtle::ConstantTimeEq;

use crate::config::{CsrfConfig, SecurityGatewayConfig};
use crate::cookies::{CookieSpec, append_set_cookie, find_cookie};
use crate::error::ConfigurationError;

/// Token exposed to handlers via request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    header_name: HeaderName,
    token: String,
}

impl CsrfToken {
    #[must_use]
    pub fn new(header_name: HeaderName, token: impl Into<String>) -> Self {
        Self {
            header_name,
            token: token.into(),
        }
    }

    /// Header the client must echo the token in.
    #[must_use]
    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Constant-time comparison against a submitted value.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        bool::from(self.token.as_bytes().ct_eq(submitted.as_bytes()))
    }
}

/// Where CSRF tokens come from and how they are persisted on the client.
pub trait CsrfTokenRepository: Send + Sync {
    fn generate_token(&self) -> CsrfToken;

    /// Token previously issued to this client, if any.
    fn load_token(&self, headers: &HeaderMap) -> Option<CsrfToken>;

    /// Persist `token` on the response; `None` removes it.
    fn save_token(&self, token: Option<&CsrfToken>, response_headers: &mut HeaderMap);

    /// Value submitted with the request for comparison.
    fn submitted_token(&self, headers: &HeaderMap) -> Option<String>;
}

/// Stores the token in a non-`HttpOnly` cookie so browser scripts can read it.
#[derive(Debug, Clone)]
pub struct CookieCsrfTokenRepository {
    cookie_name: String,
    cookie_path: String,
    header_name: HeaderName,
    secure: bool,
}

impl CookieCsrfTokenRepository {
    /// Build the repository regardless of whether pre-authentication is enabled.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidHeaderName`] for an unusable header name.
    pub fn new(cfg: &CsrfConfig, secure: bool) -> Result<Self, ConfigurationError> {
        let header_name = HeaderName::from_bytes(cfg.header_name.trim().as_bytes()).map_err(|e| {
            ConfigurationError::InvalidHeaderName {
                name: cfg.header_name.clone(),
                reason: e.to_string(),
            }
        })?;

        if !cfg.cookie_path.starts_with('/') {
            return Err(ConfigurationError::InvalidPath {
                path: cfg.cookie_path.clone(),
            });
        }

        Ok(Self {
            cookie_name: cfg.cookie_name.clone(),
            cookie_path: cfg.cookie_path.clone(),
            header_name,
            secure,
        })
    }

    /// Build the repository the gateway wires by default.
    ///
    /// # Errors
    /// - [`ConfigurationError::CsrfRepositoryDisabled`] when pre-authentication is disabled
    /// - any error from [`CookieCsrfTokenRepository::new`]
    pub fn from_config(cfg: &SecurityGatewayConfig) -> Result<Self, ConfigurationError> {
        if !cfg.enabled {
            return Err(ConfigurationError::CsrfRepositoryDisabled);
        }
        Self::new(&cfg.csrf, cfg.session.cookie_secure)
    }

    fn cookie(&self) -> CookieSpec<'_> {
        CookieSpec {
            name: &self.cookie_name,
            path: &self.cookie_path,
            http_only: false,
            secure: self.secure,
        }
    }
}

impl CsrfTokenRepository for CookieCsrfTokenRepository {
    fn generate_token(&self) -> CsrfToken {
        CsrfToken::new(self.header_name.clone(), uuid::Uuid::new_v4().to_string())
    }

    fn load_token(&self, headers: &HeaderMap) -> Option<CsrfToken> {
        find_cookie(headers, &self.cookie_name)
            .map(|token| CsrfToken::new(self.header_name.clone(), token))
    }

    fn save_token(&self, token: Option<&CsrfToken>, response_headers: &mut HeaderMap) {
        let value = match token {
            Some(token) => self.cookie().issue(token.token()),
            None => self.cookie().expire(),
        };
        append_set_cookie(response_headers, &value);
    }

    fn submitted_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }
}

/// Methods that never need a token.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::TRACE | Method::OPTIONS
    )
}
