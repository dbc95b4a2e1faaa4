//! Authorization gate applied after pre-authentication.

use axum::http::Method;
use headergate_security::SecurityContext;

use crate::config::{AccessRule, SecurityGatewayConfig};
use crate::error::ConfigurationError;

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Permit,
    /// No identity on a protected route (401).
    Unauthenticated,
    /// Identity present but lacking the required authority (403).
    Forbidden,
}

/// Decides whether a request may reach the application.
pub trait SecurityDecisionPoint: Send + Sync {
    fn decide(&self, method: &Method, path: &str, ctx: &SecurityContext) -> AccessDecision;
}

/// Lets everything through. Installed when no authentication delegate is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

impl SecurityDecisionPoint for PermitAll {
    fn decide(&self, _method: &Method, _path: &str, _ctx: &SecurityContext) -> AccessDecision {
        AccessDecision::Permit
    }
}

/// Set of route patterns compiled into a `matchit` router.
#[derive(Clone, Default)]
pub struct RouteMatcher {
    matcher: matchit::Router<()>,
}

impl RouteMatcher {
    fn insert(&mut self, pattern: &str) -> Result<(), ConfigurationError> {
        let converted = convert_axum_path_to_matchit(pattern);
        self.matcher
            .insert(converted, ())
            .map_err(|e| ConfigurationError::InvalidRoutePattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })
    }

    #[must_use]
    pub fn find(&self, path: &str) -> bool {
        self.matcher.at(path).is_ok()
    }
}

impl std::fmt::Debug for RouteMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatcher").finish_non_exhaustive()
    }
}

/// Convert Axum path syntax `:param` to matchit syntax `{param}`
fn convert_axum_path_to_matchit(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ':' {
            result.push('{');
            while matches!(chars.peek(), Some(c) if c.is_alphanumeric() || *c == '_') {
                if let Some(c) = chars.next() {
                    result.push(c);
                }
            }
            result.push('}');
        } else {
            result.push(ch);
        }
    }

    result
}

#[derive(Debug)]
struct AuthorityRule {
    matcher: RouteMatcher,
    any_authority: Vec<String>,
}

/// Configuration-driven decision point.
///
/// Public routes are always permitted. Everything else needs an identity, and
/// the first access rule whose pattern matches additionally requires one of
/// its authorities.
#[derive(Debug, Default)]
pub struct RouteAccessPolicy {
    public: RouteMatcher,
    rules: Vec<AuthorityRule>,
}

impl RouteAccessPolicy {
    /// # Errors
    /// Returns [`ConfigurationError::InvalidRoutePattern`] when a pattern cannot be compiled
    /// or two public patterns conflict.
    pub fn from_config(cfg: &SecurityGatewayConfig) -> Result<Self, ConfigurationError> {
        Self::new(&cfg.public_routes, &cfg.access_rules)
    }

    /// # Errors
    /// Same as [`RouteAccessPolicy::from_config`].
    pub fn new(
        public_routes: &[String],
        access_rules: &[AccessRule],
    ) -> Result<Self, ConfigurationError> {
        let mut public = RouteMatcher::default();
        let mut seen = std::collections::HashSet::new();
        for route in public_routes {
            if seen.insert(route.as_str()) {
                public.insert(route)?;
            }
        }

        let rules = access_rules
            .iter()
            .map(|rule| {
                let mut matcher = RouteMatcher::default();
                matcher.insert(&rule.pattern)?;
                Ok(AuthorityRule {
                    matcher,
                    any_authority: rule.any_authority.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        tracing::debug!(
            public_routes = seen.len(),
            access_rules = rules.len(),
            "Built route access policy"
        );

        Ok(Self { public, rules })
    }
}

impl SecurityDecisionPoint for RouteAccessPolicy {
    fn decide(&self, _method: &Method, path: &str, ctx: &SecurityContext) -> AccessDecision {
        if self.public.find(path) {
            return AccessDecision::Permit;
        }

        let Some(identity) = ctx.identity() else {
            return AccessDecision::Unauthenticated;
        };

        match self.rules.iter().find(|rule| rule.matcher.find(path)) {
            Some(rule) if !identity.has_any_authority(rule.any_authority.as_slice()) => {
                AccessDecision::Forbidden
            }
            _ => AccessDecision::Permit,
        }
    }
}
