#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixtures for the security chain integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use authn_delegate_sdk::{AuthenticationDelegate, AuthnDelegateError};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use headergate_security::AuthenticatedIdentity;
use security_gateway::{CsrfToken, CurrentContext, CurrentIdentity, SecurityGatewayConfig};
use static_authn_delegate::config::{DelegateMode, UserMapping};
use static_authn_delegate::{StaticAuthnDelegate, StaticAuthnDelegateConfig};
use tokio::sync::Notify;
use tower::ServiceExt;

pub const PRINCIPAL_HEADER: &str = "my_sm_user";

/// alice: USER, bob: USER + ADMIN, mallory: disabled.
pub fn static_delegate() -> StaticAuthnDelegate {
    let user = |principal: &str, authorities: &[&str]| UserMapping {
        principal: principal.to_owned(),
        authorities: Some(authorities.iter().map(|a| (*a).to_owned()).collect()),
        disabled: false,
    };

    StaticAuthnDelegate::from_config(&StaticAuthnDelegateConfig {
        mode: DelegateMode::StaticUsers,
        default_authorities: vec!["USER".to_owned()],
        users: vec![
            user("alice", &["USER"]),
            user("bob", &["ADMIN", "USER"]),
            UserMapping {
                principal: "mallory".to_owned(),
                authorities: None,
                disabled: true,
            },
        ],
    })
}

/// Wraps the static delegate and counts lookups.
pub struct CountingDelegate {
    inner: StaticAuthnDelegate,
    calls: AtomicUsize,
}

impl CountingDelegate {
    pub fn new() -> Self {
        Self {
            inner: static_delegate(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthenticationDelegate for CountingDelegate {
    async fn load_identity(
        &self,
        principal: &str,
    ) -> Result<AuthenticatedIdentity, AuthnDelegateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load_identity(principal).await
    }
}

/// Static delegate whose lookups of one principal park until released.
pub struct GatedDelegate {
    inner: StaticAuthnDelegate,
    gated: &'static str,
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

impl GatedDelegate {
    pub fn new(gated: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: static_delegate(),
            gated,
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolves once a lookup of the gated principal is parked.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl AuthenticationDelegate for GatedDelegate {
    async fn load_identity(
        &self,
        principal: &str,
    ) -> Result<AuthenticatedIdentity, AuthnDelegateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if principal == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.load_identity(principal).await
    }
}

/// Delegate whose backing directory is down.
pub struct UnavailableDelegate;

#[async_trait]
impl AuthenticationDelegate for UnavailableDelegate {
    async fn load_identity(
        &self,
        _principal: &str,
    ) -> Result<AuthenticatedIdentity, AuthnDelegateError> {
        Err(AuthnDelegateError::ServiceUnavailable(
            "directory unreachable".to_owned(),
        ))
    }
}

/// Enabled gateway with CSRF off, so plain requests exercise pre-authentication only.
pub fn preauth_config() -> SecurityGatewayConfig {
    SecurityGatewayConfig {
        enabled: true,
        csrf_enabled: false,
        ..SecurityGatewayConfig::default()
    }
}

async fn whoami(CurrentIdentity(identity): CurrentIdentity) -> String {
    let authorities: Vec<&str> = identity.authorities().iter().map(String::as_str).collect();
    format!("{}:{}", identity.principal(), authorities.join(","))
}

async fn anonymous_ok(CurrentContext(ctx): CurrentContext) -> String {
    ctx.principal().unwrap_or("anonymous").to_owned()
}

async fn csrf_token(token: CsrfToken) -> String {
    token.token().to_owned()
}

async fn cached() -> Response {
    ([(header::CACHE_CONTROL, "max-age=60")], "cached").into_response()
}

pub fn app() -> Router {
    Router::new()
        .route("/api/whoami", get(whoami))
        .route("/api/data", post(|| async { "stored" }))
        .route("/api/csrf", get(csrf_token))
        .route("/api/cached", get(cached))
        .route("/public/info", get(anonymous_ok))
        .route("/reports/{name}", get(|| async { "report" }))
        .route("/actuator/health", get(|| async { "up" }))
}

pub struct Call {
    pub method: Method,
    pub uri: &'static str,
    pub principal: Option<&'static str>,
    pub cookies: Vec<String>,
    pub headers: Vec<(&'static str, String)>,
}

impl Call {
    pub fn get(uri: &'static str) -> Self {
        Self {
            method: Method::GET,
            uri,
            principal: None,
            cookies: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn post(uri: &'static str) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(uri)
        }
    }

    pub fn as_user(mut self, principal: &'static str) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub async fn send(self, router: &Router) -> Response {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(principal) = self.principal {
            builder = builder.header(PRINCIPAL_HEADER, principal);
        }
        if !self.cookies.is_empty() {
            builder = builder.header(header::COOKIE, self.cookies.join("; "));
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub async fn body_string(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` pair of the first `Set-Cookie` for `name`.
pub fn set_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(|v| v.split(';').next().unwrap_or_default().to_owned())
}

/// Cookie value of the first `Set-Cookie` for `name`.
pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookie(headers, name).map(|pair| pair[name.len() + 1..].to_owned())
}

/// Denials are status-only.
pub async fn assert_empty_status(res: Response, status: StatusCode) {
    assert_eq!(res.status(), status);
    assert_eq!(body_string(res).await, "", "denials carry no body");
}

pub fn counting_delegate() -> Arc<CountingDelegate> {
    Arc::new(CountingDelegate::new())
}
