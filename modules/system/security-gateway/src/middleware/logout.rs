use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::cookies::{append_set_cookie, find_cookie};
use crate::csrf::CsrfTokenRepository;
use crate::session::{SessionCookie, SessionStore};

/// Shared state for the logout middleware.
#[derive(Clone)]
pub struct LogoutState {
    pub path: Arc<str>,
    /// With CSRF protection only POST logs out; otherwise GET/PUT/DELETE do too.
    pub post_only: bool,
    pub sessions: Arc<SessionStore>,
    pub session_cookie: SessionCookie,
    pub csrf_repository: Option<Arc<dyn CsrfTokenRepository>>,
}

impl LogoutState {
    fn matches(&self, method: &Method, path: &str) -> bool {
        if path != &*self.path {
            return false;
        }
        if self.post_only {
            method == Method::POST
        } else {
            matches!(
                *method,
                Method::GET | Method::POST | Method::PUT | Method::DELETE
            )
        }
    }
}

/// Invalidates the session and expires the session and CSRF cookies.
pub async fn logout_middleware(
    State(state): State<LogoutState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.matches(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    if let Some(id) = find_cookie(req.headers(), state.session_cookie.name())
        && state.sessions.invalidate(&id)
    {
        tracing::debug!("Session invalidated on logout");
    }

    let mut res = StatusCode::OK.into_response();
    append_set_cookie(res.headers_mut(), &state.session_cookie.expire());
    if let Some(repository) = &state.csrf_repository {
        repository.save_token(None, res.headers_mut());
    }
    res
}
