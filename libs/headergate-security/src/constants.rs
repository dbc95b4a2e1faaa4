/// Request header carrying the pre-authenticated principal when none is configured.
pub const DEFAULT_PRINCIPAL_HEADER: &str = "MY_SM_USER";

/// Session cookie name used when none is configured.
pub const DEFAULT_SESSION_COOKIE: &str = "SESSION";
