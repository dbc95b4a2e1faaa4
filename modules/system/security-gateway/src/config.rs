use headergate_security::constants::{DEFAULT_PRINCIPAL_HEADER, DEFAULT_SESSION_COOKIE};
use serde::{Deserialize, Serialize};

fn default_header_name() -> String {
    DEFAULT_PRINCIPAL_HEADER.to_owned()
}

fn default_true() -> bool {
    true
}

fn default_logout_path() -> String {
    "/logout".to_owned()
}

/// Security gateway configuration.
///
/// Every field has a default, so an empty document yields a disabled gateway
/// with CSRF turned on (which fails at startup unless a CSRF repository is supplied
/// or the gateway is enabled).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct SecurityGatewayConfig {
    /// Master switch for header pre-authentication. When false the pre-auth
    /// filter and the cookie CSRF repository refuse to be constructed.
    #[serde(default)]
    pub enabled: bool,

    /// Request header carrying the trusted principal name.
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Treat a missing header as a hard authentication failure instead of "no identity asserted".
    #[serde(default)]
    pub fail_on_missing_header: bool,

    /// Re-authenticate when the asserted principal differs from the session's.
    #[serde(default = "default_true")]
    pub check_for_principal_changes: bool,

    /// Enable CSRF token checks for state-changing requests.
    #[serde(default = "default_true")]
    pub csrf_enabled: bool,

    /// Cookie/header names for the cookie CSRF repository
    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Content-Security-Policy value; blank disables the header.
    #[serde(default)]
    pub csp_policy: String,

    /// Emit `Content-Security-Policy-Report-Only` instead of the enforcing header.
    #[serde(default)]
    pub csp_report_only: bool,

    /// Add nosniff / frame / cache-control headers to every response.
    #[serde(default = "default_true")]
    pub default_security_headers: bool,

    /// Requests under this prefix bypass the whole chain. Blank disables the bypass.
    #[serde(default)]
    pub management_path_prefix: String,

    /// Route patterns (`/health`, `/docs/{*rest}`) reachable without an identity.
    #[serde(default)]
    pub public_routes: Vec<String>,

    /// Authority requirements, first matching rule wins.
    #[serde(default)]
    pub access_rules: Vec<AccessRule>,

    /// Path handled by the logout stage.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    #[serde(default)]
    pub session: SessionConfig,

    /// Upper bound for one delegate lookup, in milliseconds. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_timeout_ms: Option<u64>,

    #[serde(default)]
    pub cors_enabled: bool,
    /// Optional detailed CORS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsConfig>,
}

impl Default for SecurityGatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: default_header_name(),
            fail_on_missing_header: false,
            check_for_principal_changes: true,
            csrf_enabled: true,
            csrf: CsrfConfig::default(),
            csp_policy: String::new(),
            csp_report_only: false,
            default_security_headers: true,
            management_path_prefix: String::new(),
            public_routes: Vec::new(),
            access_rules: Vec::new(),
            logout_path: default_logout_path(),
            session: SessionConfig::default(),
            delegate_timeout_ms: None,
            cors_enabled: false,
            cors: None,
        }
    }
}

/// Authority requirement for a route pattern.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessRule {
    /// Route pattern in `matchit` syntax; `:param` segments are accepted too.
    pub pattern: String,
    /// The identity must hold at least one of these.
    pub any_authority: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CsrfConfig {
    pub cookie_name: String,
    pub header_name: String,
    pub cookie_path: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "XSRF-TOKEN".to_owned(),
            header_name: "X-XSRF-TOKEN".to_owned(),
            cookie_path: "/".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sessions idle for longer than this are discarded on next access.
    pub idle_timeout_secs: u64,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
    /// Minimum spacing between idle-session sweeps triggered by session creation.
    pub sweep_interval_secs: u64,
    /// Upper bound on live sessions. At the limit, new identities are still
    /// authenticated for the request but get no session.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE.to_owned(),
            idle_timeout_secs: 30 * 60,
            cookie_secure: false,
            sweep_interval_secs: 60,
            max_sessions: 100_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CorsConfig {
    /// Allowed origins: `["*"]` means any
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods, e.g. `["GET","POST","OPTIONS","PUT","DELETE","PATCH"]`
    pub allowed_methods: Vec<String>,
    /// Allowed request headers; `["*"]` means any
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials
    pub allow_credentials: bool,
    /// Max age for preflight caching in seconds
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_owned()],
            allowed_methods: vec![
                "GET".to_owned(),
                "POST".to_owned(),
                "PUT".to_owned(),
                "PATCH".to_owned(),
                "DELETE".to_owned(),
                "OPTIONS".to_owned(),
            ],
            allowed_headers: vec!["*".to_owned()],
            allow_credentials: false,
            max_age_seconds: 600,
        }
    }
}
