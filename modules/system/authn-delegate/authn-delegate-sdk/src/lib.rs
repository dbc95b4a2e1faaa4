//! Authentication delegate SDK
//!
//! This crate provides the contract between the pre-authentication filter and
//! whatever resolves a trusted principal name into an identity:
//!
//! - [`AuthenticationDelegate`] - lookup trait implemented by delegates
//! - [`AuthnDelegateError`] - error types
//!
//! ## Usage
//!
//! ```ignore
//! use authn_delegate_sdk::AuthenticationDelegate;
//!
//! let identity = delegate.load_identity("alice").await?;
//! assert_eq!(identity.principal(), "alice");
//! ```

pub mod api;
pub mod error;

// Re-export main types at crate root
pub use api::AuthenticationDelegate;
pub use error::AuthnDelegateError;
pub use headergate_security::AuthenticatedIdentity;
