//! Minimal cookie helpers for the session and CSRF cookies.

use axum::http::{HeaderMap, HeaderValue, header};

/// Attributes of a cookie issued by the gateway.
#[derive(Debug, Clone)]
pub struct CookieSpec<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub http_only: bool,
    pub secure: bool,
}

impl CookieSpec<'_> {
    /// `Set-Cookie` value carrying `value`. Session-scoped (no `Max-Age`).
    #[must_use]
    pub fn issue(&self, value: &str) -> String {
        self.render(value, None)
    }

    /// `Set-Cookie` value that makes the browser drop the cookie.
    #[must_use]
    pub fn expire(&self) -> String {
        self.render("", Some(0))
    }

    fn render(&self, value: &str, max_age: Option<u64>) -> String {
        let mut out = format!("{}={value}; Path={}", self.name, self.path);
        if let Some(max_age) = max_age {
            out.push_str("; Max-Age=");
            out.push_str(&max_age.to_string());
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=Lax");
        out
    }
}

/// Value of the first cookie called `name` across all `Cookie` headers.
#[must_use]
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|raw| raw.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(name)
                .and_then(|tail| tail.strip_prefix('='))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        })
}

/// Append a `Set-Cookie` header. Values that are not valid header text are dropped.
pub fn append_set_cookie(headers: &mut HeaderMap, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.append(header::SET_COOKIE, v);
        }
        Err(_) => tracing::warn!("dropping unencodable Set-Cookie value"),
    }
}
