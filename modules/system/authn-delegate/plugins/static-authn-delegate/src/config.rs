//! Configuration for the static authentication delegate.

use serde::{Deserialize, Serialize};

/// Delegate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticAuthnDelegateConfig {
    /// Lookup mode.
    pub mode: DelegateMode,

    /// Authorities granted in `accept_all` mode, and to listed users without explicit authorities.
    pub default_authorities: Vec<String>,

    /// Known principals for `static_users` mode.
    pub users: Vec<UserMapping>,
}

impl Default for StaticAuthnDelegateConfig {
    fn default() -> Self {
        Self {
            mode: DelegateMode::AcceptAll,
            default_authorities: vec!["USER".to_owned()],
            users: Vec::new(),
        }
    }
}

/// Lookup mode.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DelegateMode {
    /// Accept any non-empty principal with the default authorities.
    #[default]
    AcceptAll,
    /// Accept only the configured users.
    StaticUsers,
}

/// A known principal and what it may do.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UserMapping {
    /// Principal name as asserted by the upstream proxy.
    pub principal: String,
    /// Granted authorities; falls back to `default_authorities` when omitted.
    #[serde(default)]
    pub authorities: Option<Vec<String>>,
    /// Disabled users are known but refused.
    #[serde(default)]
    pub disabled: bool,
}
