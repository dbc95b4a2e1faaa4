//! Axum extractors for handlers behind the security chain.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use headergate_security::{AuthenticatedIdentity, SecurityContext};

use crate::csrf::CsrfToken;

/// The authenticated identity of the request. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(SecurityContext::identity)
            .cloned()
            .map(CurrentIdentity)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// The request's security context snapshot; empty when no pre-auth stage ran.
#[derive(Debug, Clone, Default)]
pub struct CurrentContext(pub SecurityContext);

impl<S> FromRequestParts<S> for CurrentContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<SecurityContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// The CSRF token, when the CSRF stage is installed.
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(ctx: Option<SecurityContext>) -> Parts {
        let mut req = Request::builder().uri("/").body(()).unwrap();
        if let Some(ctx) = ctx {
            req.extensions_mut().insert(ctx);
        }
        req.into_parts().0
    }

    #[tokio::test]
    async fn identity_is_extracted_from_context() {
        let identity = AuthenticatedIdentity::pre_authenticated("alice", ["USER"]).unwrap();
        let mut parts = parts_with(Some(SecurityContext::authenticated(identity)));

        let CurrentIdentity(found) = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.principal(), "alice");
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_with_401() {
        let mut parts = parts_with(Some(SecurityContext::empty()));

        let rejection = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(rejection, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn context_defaults_to_empty() {
        let mut parts = parts_with(None);

        let CurrentContext(ctx) = CurrentContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(!ctx.is_authenticated());
    }
}
