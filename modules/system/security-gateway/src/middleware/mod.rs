pub mod csrf;
pub mod decision;
pub mod logout;
pub mod preauth;
pub mod security_headers;

use axum::http::{HeaderMap, Method, header};

/// Check if this is a CORS preflight request
///
/// Preflight requests are OPTIONS requests with:
/// - Origin header present
/// - Access-Control-Request-Method header present
#[must_use]
pub fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(header::ORIGIN)
        && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
