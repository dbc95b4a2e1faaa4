#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CSRF, header writers and logout around the pre-authentication stage.

mod common;

use std::sync::Arc;

use axum::http::{StatusCode, header};
use security_gateway::{SecurityChain, SecurityGatewayConfig};

use common::{
    Call, app, assert_empty_status, body_string, preauth_config, set_cookie, set_cookie_value,
    static_delegate,
};

fn csrf_config() -> SecurityGatewayConfig {
    SecurityGatewayConfig {
        enabled: true,
        ..SecurityGatewayConfig::default()
    }
}

fn router_with(config: SecurityGatewayConfig) -> (SecurityChain, axum::Router) {
    let chain = SecurityChain::builder(config)
        .delegate(Arc::new(static_delegate()))
        .build()
        .unwrap();
    let router = chain.secure(app());
    (chain, router)
}

#[tokio::test]
async fn safe_request_issues_csrf_cookie_readable_by_scripts() {
    let (_, router) = router_with(csrf_config());

    let res = Call::get("/api/csrf").as_user("alice").send(&router).await;

    assert_eq!(res.status(), StatusCode::OK);
    let raw = res
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .find_map(|v| v.to_str().ok().filter(|v| v.starts_with("XSRF-TOKEN=")))
        .unwrap()
        .to_owned();
    assert!(!raw.contains("HttpOnly"));
    assert!(raw.contains("Path=/"));

    let issued = set_cookie_value(res.headers(), "XSRF-TOKEN").unwrap();
    assert_eq!(body_string(res).await, issued);
}

#[tokio::test]
async fn existing_csrf_cookie_is_reused() {
    let (_, router) = router_with(csrf_config());

    let res = Call::get("/api/csrf")
        .as_user("alice")
        .cookie("XSRF-TOKEN=known-token")
        .send(&router)
        .await;

    assert!(set_cookie(res.headers(), "XSRF-TOKEN").is_none());
    assert_eq!(body_string(res).await, "known-token");
}

#[tokio::test]
async fn state_changing_request_without_token_is_forbidden() {
    let (_, router) = router_with(csrf_config());

    let res = Call::post("/api/data").as_user("alice").send(&router).await;

    assert!(
        set_cookie(res.headers(), "XSRF-TOKEN").is_some(),
        "fresh token issued so the client can retry"
    );
    assert_empty_status(res, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
async fn state_changing_request_with_matching_token_passes() {
    let (_, router) = router_with(csrf_config());

    let res = Call::post("/api/data")
        .as_user("alice")
        .cookie("XSRF-TOKEN=t0k3n")
        .header("x-xsrf-token", "t0k3n")
        .send(&router)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "stored");
}

#[tokio::test]
async fn mismatched_token_is_forbidden() {
    let (_, router) = router_with(csrf_config());

    let res = Call::post("/api/data")
        .as_user("alice")
        .cookie("XSRF-TOKEN=t0k3n")
        .header("x-xsrf-token", "other")
        .send(&router)
        .await;

    assert_empty_status(res, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
async fn csrf_check_runs_before_authentication() {
    let (chain, router) = router_with(csrf_config());

    let res = Call::post("/api/data").as_user("alice").send(&router).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(chain.session_count(), 0);
}

#[tokio::test]
async fn enforcing_csp_is_written_on_every_response() {
    let cfg = SecurityGatewayConfig {
        csp_policy: "default-src 'self'".to_owned(),
        ..preauth_config()
    };
    let (_, router) = router_with(cfg);

    let ok = Call::get("/api/whoami").as_user("alice").send(&router).await;
    let denied = Call::get("/api/whoami").send(&router).await;

    for res in [&ok, &denied] {
        assert_eq!(
            res.headers().get(header::CONTENT_SECURITY_POLICY).unwrap(),
            "default-src 'self'"
        );
        assert!(
            res.headers()
                .get(header::CONTENT_SECURITY_POLICY_REPORT_ONLY)
                .is_none()
        );
    }
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn report_only_csp_uses_report_only_header() {
    let cfg = SecurityGatewayConfig {
        csp_policy: "default-src 'self'".to_owned(),
        csp_report_only: true,
        ..preauth_config()
    };
    let (_, router) = router_with(cfg);

    let res = Call::get("/api/whoami").as_user("alice").send(&router).await;

    assert!(res.headers().get(header::CONTENT_SECURITY_POLICY).is_none());
    assert_eq!(
        res.headers()
            .get(header::CONTENT_SECURITY_POLICY_REPORT_ONLY)
            .unwrap(),
        "default-src 'self'"
    );
}

#[tokio::test]
async fn blank_csp_writes_no_policy_header() {
    let (_, router) = router_with(preauth_config());

    let res = Call::get("/api/whoami").as_user("alice").send(&router).await;

    assert!(res.headers().get(header::CONTENT_SECURITY_POLICY).is_none());
    assert!(
        res.headers()
            .get(header::CONTENT_SECURITY_POLICY_REPORT_ONLY)
            .is_none()
    );
}

#[tokio::test]
async fn default_security_headers_respect_handler_values() {
    let (_, router) = router_with(preauth_config());

    let res = Call::get("/api/cached").as_user("alice").send(&router).await;
    let headers = res.headers();

    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(headers.get(header::X_XSS_PROTECTION).unwrap(), "1; mode=block");
    assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
    assert_eq!(headers.get(header::EXPIRES).unwrap(), "0");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "max-age=60");
}

#[tokio::test]
async fn default_security_headers_can_be_switched_off() {
    let cfg = SecurityGatewayConfig {
        default_security_headers: false,
        ..preauth_config()
    };
    let (_, router) = router_with(cfg);

    let res = Call::get("/api/whoami").as_user("alice").send(&router).await;

    assert!(res.headers().get(header::X_FRAME_OPTIONS).is_none());
    assert!(res.headers().get(header::CACHE_CONTROL).is_none());
}

#[tokio::test]
async fn logout_invalidates_session_and_expires_cookies() {
    let (chain, router) = router_with(preauth_config());
    let res = Call::get("/api/whoami").as_user("alice").send(&router).await;
    let session = set_cookie(res.headers(), "SESSION").unwrap();
    assert_eq!(chain.session_count(), 1);

    let res = Call::get("/logout").cookie(session.clone()).send(&router).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(set_cookie(res.headers(), "SESSION").as_deref(), Some("SESSION="));
    assert_eq!(chain.session_count(), 0);
    assert_eq!(body_string(res).await, "");

    let res = Call::get("/api/whoami").cookie(session).send(&router).await;
    assert_empty_status(res, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn csrf_protected_logout_requires_post_with_token() {
    let (chain, router) = router_with(csrf_config());
    let res = Call::get("/api/whoami").as_user("alice").send(&router).await;
    let session = set_cookie(res.headers(), "SESSION").unwrap();

    let res = Call::post("/logout").cookie(session.clone()).send(&router).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(chain.session_count(), 1);

    let res = Call::post("/logout")
        .cookie(session)
        .cookie("XSRF-TOKEN=t0k3n")
        .header("x-xsrf-token", "t0k3n")
        .send(&router)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        set_cookie(res.headers(), "XSRF-TOKEN").as_deref(),
        Some("XSRF-TOKEN=")
    );
    assert_eq!(chain.session_count(), 0);
}
