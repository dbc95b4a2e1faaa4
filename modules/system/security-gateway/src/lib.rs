#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Header pre-authentication security gateway.
//!
//! Trusts a principal asserted by an upstream proxy in a request header,
//! resolves it through an [`authn_delegate_sdk::AuthenticationDelegate`] and
//! keeps the resulting identity in a server-side session. The chain also
//! carries CSRF, CORS, CSP and logout stages; see [`chain`] for the order.
//!
//! ```ignore
//! let chain = SecurityChain::builder(config)
//!     .delegate(delegate)
//!     .build()?;
//! let app = chain.secure(Router::new().route("/api/whoami", get(whoami)));
//! ```

pub mod chain;
pub mod config;
pub mod cookies;
pub mod cors;
pub mod csrf;
pub mod decision;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod middleware;
pub mod preauth;
pub mod session;

pub use chain::{SecurityChain, SecurityChainBuilder};
pub use config::{AccessRule, CorsConfig, CsrfConfig, SecurityGatewayConfig, SessionConfig};
pub use csrf::{CookieCsrfTokenRepository, CsrfToken, CsrfTokenRepository};
pub use decision::{AccessDecision, PermitAll, RouteAccessPolicy, SecurityDecisionPoint};
pub use error::{ConfigurationError, HeaderMissingError, PreAuthError};
pub use extract::{CurrentContext, CurrentIdentity};
pub use extractor::HeaderIdentityExtractor;
pub use preauth::{PreAuthFilter, Transition};
