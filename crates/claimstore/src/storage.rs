//! Storage traits for request-object persistence.
//!
//! The store anchors each request object to a reference record whose lookup
//! key changes as the authorization flow advances: first the transient
//! session data key, then the authorization code id, then the access token
//! id (rotated again on token refresh). Claims hang off the reference and
//! follow it through every rebind.
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `claimstore-postgres` - PostgreSQL storage backend

use async_trait::async_trait;

use crate::claims::{ClaimSurface, RequestedClaim};
use crate::error::OidcResult;

/// Token-to-identifier resolution contract.
///
/// Resolves an opaque bearer token string to the internal access-token
/// identifier request-object references are keyed by. The token store
/// itself is an external collaborator; the request-object store only
/// consumes this lookup.
#[async_trait]
pub trait AccessTokenResolver: Send + Sync {
    /// Resolve an opaque token to its internal token id.
    ///
    /// Returns `Ok(None)` when the token is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    async fn resolve_token_id(&self, token: &str) -> OidcResult<Option<String>>;
}

/// Storage trait for request objects and their claims.
///
/// Every multi-statement operation completes as a single committed unit of
/// work: a failed sequence leaves either the prior consistent state or none
/// at all. Rebind and delete operations matching zero rows are accepted as
/// no-ops, since callers may legitimately race a cleanup against a flow
/// that has already completed.
#[async_trait]
pub trait RequestObjectStore: Send + Sync {
    /// Persist a request object keyed by its session data key, together
    /// with every claim from every group and any enumerated claim values.
    ///
    /// Groups are flattened in order; retrieval preserves insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is persisted in that
    /// case.
    async fn insert(
        &self,
        consumer_key: &str,
        session_data_key: &str,
        claim_groups: &[Vec<RequestedClaim>],
    ) -> OidcResult<()>;

    /// Rebind the reference matching `session_data_key` to an authorization
    /// code id, clearing any token id.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails. A missing reference is not an
    /// error.
    async fn rebind_by_code(&self, session_data_key: &str, code_id: &str) -> OidcResult<()>;

    /// Rebind the reference matching `session_data_key` directly to an
    /// access token id, clearing any code id. This is the path for grants
    /// that issue a token without a prior code.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails. A missing reference is not an
    /// error.
    async fn rebind_by_token(&self, session_data_key: &str, token_id: &str) -> OidcResult<()>;

    /// The code-to-token exchange: rewrite the reference bound to `code_id`
    /// to carry `token_id` instead, after deleting any stale reference
    /// already bound to `token_id`. At most one reference is ever bound to
    /// a token id, and retrying with the same arguments leaves exactly one.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup delete or the rewrite fails; the
    /// rewrite is never applied without the cleanup.
    async fn rebind_code_to_token(&self, code_id: &str, token_id: &str) -> OidcResult<()>;

    /// Rewrite the reference bound to `old_token_id` to carry
    /// `new_token_id` after a token refresh. The claim tree is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails. A missing reference is not an
    /// error.
    async fn refresh(&self, old_token_id: &str, new_token_id: &str) -> OidcResult<()>;

    /// Resolve `token` through the token-lookup contract and return the
    /// claims of the reference bound to it, filtered to `surface`, in
    /// insertion order.
    ///
    /// Returns an empty vector when the token resolves to nothing or the
    /// reference has no claims for the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the query fails.
    async fn claims_for_token(
        &self,
        token: &str,
        surface: ClaimSurface,
    ) -> OidcResult<Vec<RequestedClaim>>;

    /// Delete the reference bound to `token_id` and its claim tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails. A missing reference is not an
    /// error.
    async fn delete_by_token_id(&self, token_id: &str) -> OidcResult<()>;

    /// Delete the reference bound to `code_id` and its claim tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails. A missing reference is not an
    /// error.
    async fn delete_by_code(&self, code_id: &str) -> OidcResult<()>;
}
