//! Extraction of the pre-authenticated principal from request headers.

use axum::http::{HeaderMap, HeaderName};

use crate::error::HeaderMissingError;

/// Reads the trusted principal header.
///
/// Only parses: whether the header can be trusted is a property of the
/// deployment (the upstream proxy strips or overwrites it).
#[derive(Debug, Clone)]
pub struct HeaderIdentityExtractor {
    header: HeaderName,
    fail_on_missing_header: bool,
}

impl HeaderIdentityExtractor {
    #[must_use]
    pub fn new(header: HeaderName, fail_on_missing_header: bool) -> Self {
        Self {
            header,
            fail_on_missing_header,
        }
    }

    #[must_use]
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Extract the principal asserted on this request.
    ///
    /// Returns `Ok(None)` when nothing usable is asserted: the header is absent,
    /// blank, or not valid visible ASCII.
    ///
    /// # Errors
    /// Returns [`HeaderMissingError`] instead of `Ok(None)` in strict mode.
    pub fn extract(&self, headers: &HeaderMap) -> Result<Option<String>, HeaderMissingError> {
        let principal = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        match principal {
            None if self.fail_on_missing_header => Err(HeaderMissingError {
                header: self.header.as_str().to_owned(),
            }),
            other => Ok(other),
        }
    }
}
