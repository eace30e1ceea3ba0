//! OIDC request-object claim model and token introspection assembly.
//!
//! A request object is the signed set of identity claims a client asked for
//! in an OIDC authorization request. This crate owns the domain side of
//! persisting those claims and of assembling RFC 7662 token introspection
//! responses:
//!
//! - Claim records and the ID-token / user-info surface discriminator
//! - The token-lookup contract used to resolve opaque tokens
//! - The request-object store trait (implemented by `claimstore-postgres`)
//! - Two-phase introspection response construction
//!
//! # Example
//!
//! ```
//! use claimstore::introspection::{IntrospectionResponse, TokenMetadata};
//!
//! let meta = TokenMetadata {
//!     active: true,
//!     expiration: 1_999_999_999,
//!     subject: Some("alice".to_string()),
//!     ..Default::default()
//! };
//! let response = IntrospectionResponse::from_metadata(&meta);
//! assert_eq!(response.exp, Some(1_999_999_999));
//! ```

pub mod claims;
pub mod error;
pub mod introspection;
pub mod storage;

pub use claims::{ClaimSurface, RequestedClaim};
pub use error::{OidcError, OidcResult};
pub use introspection::{IntrospectionResponse, TokenMetadata};
pub use storage::{AccessTokenResolver, RequestObjectStore};
