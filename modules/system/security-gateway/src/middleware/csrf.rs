use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::csrf::{CsrfTokenRepository, is_safe_method};

/// Shared state for the CSRF middleware.
#[derive(Clone)]
pub struct CsrfState {
    pub repository: Arc<dyn CsrfTokenRepository>,
}

/// Loads or issues the CSRF token and rejects state-changing requests that do
/// not echo it. A freshly issued token is persisted even on rejection so the
/// client can retry.
pub async fn csrf_middleware(
    State(state): State<CsrfState>,
    mut req: Request,
    next: Next,
) -> Response {
    let (token, issued) = match state.repository.load_token(req.headers()) {
        Some(token) => (token, false),
        None => (state.repository.generate_token(), true),
    };

    if !is_safe_method(req.method()) {
        let valid = state
            .repository
            .submitted_token(req.headers())
            .is_some_and(|submitted| token.matches(&submitted));

        if !valid {
            tracing::debug!(
                method = %req.method(),
                path = %req.uri().path(),
                "Invalid CSRF token"
            );
            let mut res = StatusCode::FORBIDDEN.into_response();
            if issued {
                state.repository.save_token(Some(&token), res.headers_mut());
            }
            return res;
        }
    }

    req.extensions_mut().insert(token.clone());
    let mut res = next.run(req).await;
    if issued {
        state.repository.save_token(Some(&token), res.headers_mut());
    }
    res
}
