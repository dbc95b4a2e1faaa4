//! Response header writers: Content-Security-Policy and the default
//! hardening headers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, header};
use axum::response::Response;
use tower::{Layer, Service};

use crate::config::SecurityGatewayConfig;
use crate::error::ConfigurationError;

fn default_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
        (header::EXPIRES, HeaderValue::from_static("0")),
    ]
}

/// Adds configured headers to every response unless the handler already set them.
#[derive(Clone, Debug)]
pub struct SecurityHeadersLayer {
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl SecurityHeadersLayer {
    /// # Errors
    /// Returns [`ConfigurationError::InvalidCspPolicy`] if the policy is not a valid header value.
    pub fn from_config(cfg: &SecurityGatewayConfig) -> Result<Self, ConfigurationError> {
        let mut headers = Vec::new();

        let policy = cfg.csp_policy.trim();
        if !policy.is_empty() {
            let value = HeaderValue::from_str(policy)
                .map_err(|e| ConfigurationError::InvalidCspPolicy(e.to_string()))?;
            let name = if cfg.csp_report_only {
                header::CONTENT_SECURITY_POLICY_REPORT_ONLY
            } else {
                header::CONTENT_SECURITY_POLICY
            };
            headers.push((name, value));
        }

        if cfg.default_security_headers {
            headers.extend(default_headers());
        }

        Ok(Self {
            headers: headers.into(),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S, B> Service<Request<B>> for SecurityHeadersService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let headers = Arc::clone(&self.headers);
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut res = inner.call(req).await?;
            write_missing(res.headers_mut(), &headers);
            Ok(res)
        })
    }
}

fn write_missing(target: &mut HeaderMap, headers: &[(HeaderName, HeaderValue)]) {
    for (name, value) in headers {
        if !target.contains_key(name) {
            target.insert(name.clone(), value.clone());
        }
    }
}
