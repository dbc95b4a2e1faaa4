//! Pre-authentication stage: binds the request to its session and runs the
//! [`PreAuthFilter`] against the session's security context.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use headergate_security::SecurityContext;

use crate::cookies::{append_set_cookie, find_cookie};
use crate::error::PreAuthError;
use crate::preauth::PreAuthFilter;
use crate::session::{SessionCookie, SessionEntry, SessionStore};

/// Shared state for the pre-authentication middleware.
#[derive(Clone)]
pub struct PreAuthState {
    pub filter: Arc<PreAuthFilter>,
    pub sessions: Arc<SessionStore>,
    pub session_cookie: SessionCookie,
}

/// For each request:
/// 1. Skips CORS preflight requests
/// 2. Loads the session named by the session cookie, if it is still live
/// 3. Runs the filter against the session's context, holding the session lock
///    for the whole step; without a session a request-scoped context is used
///    and a session is only created once an identity is established
/// 4. Rotates the session id whenever an identity is established in an existing session
/// 5. Inserts a snapshot of the context (and any failure) into request extensions
pub async fn preauth_middleware(
    State(state): State<PreAuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if super::is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    let session_id = find_cookie(req.headers(), state.session_cookie.name());
    let session = session_id
        .as_deref()
        .and_then(|id| state.sessions.lookup(id).map(|entry| (id, entry)));

    let in_session = match session {
        Some((id, entry)) => run_in_session(&state, id, &entry, req.headers()).await,
        None => None,
    };
    let StageResult {
        snapshot,
        failure,
        issued_session,
    } = match in_session {
        Some(result) => result,
        None => run_without_session(&state, req.headers()).await,
    };

    req.extensions_mut().insert(snapshot);
    if let Some(failure) = failure {
        req.extensions_mut().insert(failure);
    }

    let mut res = next.run(req).await;
    if let Some(id) = issued_session {
        append_set_cookie(res.headers_mut(), &state.session_cookie.issue(&id));
    }
    res
}

struct StageResult {
    snapshot: SecurityContext,
    failure: Option<PreAuthError>,
    issued_session: Option<String>,
}

/// Runs the filter under the session lock. `None` when the session was rotated
/// or invalidated while this request waited for the lock.
async fn run_in_session(
    state: &PreAuthState,
    id: &str,
    entry: &Arc<SessionEntry>,
    headers: &HeaderMap,
) -> Option<StageResult> {
    let mut ctx = entry.context().lock().await;
    if !state.sessions.is_current(id, entry) {
        tracing::debug!("Session replaced while waiting for it; continuing without it");
        return None;
    }

    let was_authenticated = ctx.is_authenticated();
    let asserted = state.filter.extractor().extract(headers);
    let transition = state.filter.plan(&ctx, asserted);
    let outcome = state.filter.apply(&mut ctx, transition).await;

    // Any authentication into an existing session gets a fresh id, including
    // one left empty by a strict-mode clear or a rejected principal change.
    let authenticated_now =
        ctx.is_authenticated() && (outcome.principal_changed || !was_authenticated);
    let issued_session = if authenticated_now {
        state.sessions.rotate(id)
    } else {
        None
    };
    if issued_session.is_some() {
        tracing::debug!("Rotated session id after authentication");
    }

    Some(StageResult {
        snapshot: ctx.clone(),
        failure: outcome.failure,
        issued_session,
    })
}

/// Request-scoped context; a session is created only once an identity is established.
async fn run_without_session(state: &PreAuthState, headers: &HeaderMap) -> StageResult {
    let mut ctx = SecurityContext::empty();
    let asserted = state.filter.extractor().extract(headers);
    let transition = state.filter.plan(&ctx, asserted);
    let outcome = state.filter.apply(&mut ctx, transition).await;

    let issued_session = if ctx.is_authenticated() {
        state.sessions.create(ctx.clone())
    } else {
        None
    };
    StageResult {
        snapshot: ctx,
        failure: outcome.failure,
        issued_session,
    }
}
