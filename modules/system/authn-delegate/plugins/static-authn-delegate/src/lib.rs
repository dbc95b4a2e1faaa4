#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static authentication delegate
//!
//! Resolves pre-authenticated principals from configuration, for development,
//! demos and tests.
//!
//! ## Modes
//!
//! - **`accept_all`** (default): Any non-empty principal is accepted and granted
//!   the configured `default_authorities`.
//!
//! - **`static_users`**: Only principals listed under `users` are accepted, each
//!   with its own authorities. Users marked `disabled` are rejected.
//!
//! ## Configuration
//!
//! ```yaml
//! authn_delegate:
//!   mode: static_users
//!   default_authorities: ["USER"]
//!   users:
//!     - principal: alice
//!       authorities: ["USER", "ADMIN"]
//!     - principal: mallory
//!       disabled: true
//! ```

pub mod config;
pub mod domain;

pub use config::StaticAuthnDelegateConfig;
pub use domain::service::Service as StaticAuthnDelegate;
