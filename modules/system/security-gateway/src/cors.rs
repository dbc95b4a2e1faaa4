//! CORS layer built from [`CorsConfig`].

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfig;
use crate::error::ConfigurationError;

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v.trim() == "*")
}

/// Build the CORS layer.
///
/// # Errors
/// Returns [`ConfigurationError::InvalidCors`] when credentials are combined with a
/// wildcard, or when an origin, method or header cannot be parsed.
pub fn build_cors_layer(cfg: &CorsConfig) -> Result<CorsLayer, ConfigurationError> {
    if cfg.allow_credentials
        && (is_wildcard(&cfg.allowed_origins)
            || is_wildcard(&cfg.allowed_methods)
            || is_wildcard(&cfg.allowed_headers))
    {
        return Err(ConfigurationError::InvalidCors(
            "wildcards cannot be combined with allow_credentials".to_owned(),
        ));
    }

    let allow_origin = if is_wildcard(&cfg.allowed_origins) {
        AllowOrigin::from(Any)
    } else {
        let origins = cfg
            .allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o.trim())
                    .map_err(|e| ConfigurationError::InvalidCors(format!("origin '{o}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    let allow_methods = if is_wildcard(&cfg.allowed_methods) {
        AllowMethods::from(Any)
    } else {
        let methods = cfg
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|e| ConfigurationError::InvalidCors(format!("method '{m}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowMethods::list(methods)
    };

    let allow_headers = if is_wildcard(&cfg.allowed_headers) {
        AllowHeaders::from(Any)
    } else {
        let headers = cfg
            .allowed_headers
            .iter()
            .map(|h| {
                HeaderName::from_bytes(h.trim().as_bytes())
                    .map_err(|e| ConfigurationError::InvalidCors(format!("header '{h}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowHeaders::list(headers)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(allow_methods)
        .allow_headers(allow_headers)
        .allow_credentials(cfg.allow_credentials)
        .max_age(Duration::from_secs(cfg.max_age_seconds)))
}
