use std::sync::Arc;

use authn_delegate_sdk::AuthnDelegateError;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use headergate_security::SecurityContext;

use crate::decision::{AccessDecision, SecurityDecisionPoint};
use crate::error::PreAuthError;

/// Shared state for the authorization middleware.
#[derive(Clone)]
pub struct DecisionState {
    pub decision_point: Arc<dyn SecurityDecisionPoint>,
}

/// Runs the decision point; denials are answered with an empty status-only response.
pub async fn decision_middleware(
    State(state): State<DecisionState>,
    req: Request,
    next: Next,
) -> Response {
    if super::is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    let decision = {
        let empty = SecurityContext::empty();
        let ctx = req.extensions().get::<SecurityContext>().unwrap_or(&empty);
        state
            .decision_point
            .decide(req.method(), req.uri().path(), ctx)
    };

    match decision {
        AccessDecision::Permit => next.run(req).await,
        AccessDecision::Forbidden => {
            tracing::debug!(path = %req.uri().path(), "Access denied: missing authority");
            StatusCode::FORBIDDEN.into_response()
        }
        AccessDecision::Unauthenticated => {
            let status = unauthenticated_status(req.extensions().get::<PreAuthError>());
            tracing::debug!(path = %req.uri().path(), status = status.as_u16(), "Access denied: no identity");
            status.into_response()
        }
    }
}

/// 401 unless the identity is missing because the delegate itself failed.
fn unauthenticated_status(failure: Option<&PreAuthError>) -> StatusCode {
    match failure {
        Some(PreAuthError::DelegateLookup {
            source: AuthnDelegateError::ServiceUnavailable(_),
            ..
        }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(PreAuthError::DelegateLookup {
            source: AuthnDelegateError::Internal(_),
            ..
        }) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    }
}
