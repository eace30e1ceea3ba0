//! Arc-owning storage adapter for use behind trait objects.
//!
//! Wraps the lifetime-based [`RequestObjectStorage`] with an owned
//! `Arc<PgPool>` and a token resolver, allowing it to be used as
//! `Arc<dyn RequestObjectStore>` by the authorization-flow driver and the
//! introspection endpoint.

use std::sync::Arc;

use async_trait::async_trait;

use claimstore::{
    AccessTokenResolver, ClaimSurface, OidcResult, RequestObjectStore, RequestedClaim,
};

use crate::PgPool;
use crate::request_object::RequestObjectStorage;

/// Arc-owning PostgreSQL request-object storage adapter.
#[derive(Clone)]
pub struct ArcRequestObjectStorage {
    pool: Arc<PgPool>,
    resolver: Arc<dyn AccessTokenResolver>,
}

impl ArcRequestObjectStorage {
    /// Create a new Arc-owning request-object storage.
    ///
    /// The resolver is the external token store's lookup contract, used to
    /// turn opaque tokens into internal token ids during claim retrieval.
    #[must_use]
    pub fn new(pool: Arc<PgPool>, resolver: Arc<dyn AccessTokenResolver>) -> Self {
        Self { pool, resolver }
    }
}

#[async_trait]
impl RequestObjectStore for ArcRequestObjectStorage {
    async fn insert(
        &self,
        consumer_key: &str,
        session_data_key: &str,
        claim_groups: &[Vec<RequestedClaim>],
    ) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage
            .insert(consumer_key, session_data_key, claim_groups)
            .await
            .map_err(Into::into)
    }

    async fn rebind_by_code(&self, session_data_key: &str, code_id: &str) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage
            .rebind_by_code(session_data_key, code_id)
            .await
            .map_err(Into::into)
    }

    async fn rebind_by_token(&self, session_data_key: &str, token_id: &str) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage
            .rebind_by_token(session_data_key, token_id)
            .await
            .map_err(Into::into)
    }

    async fn rebind_code_to_token(&self, code_id: &str, token_id: &str) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage
            .rebind_code_to_token(code_id, token_id)
            .await
            .map_err(Into::into)
    }

    async fn refresh(&self, old_token_id: &str, new_token_id: &str) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage
            .refresh(old_token_id, new_token_id)
            .await
            .map_err(Into::into)
    }

    async fn claims_for_token(
        &self,
        token: &str,
        surface: ClaimSurface,
    ) -> OidcResult<Vec<RequestedClaim>> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage
            .claims_for_token(self.resolver.as_ref(), token, surface)
            .await
            .map_err(Into::into)
    }

    async fn delete_by_token_id(&self, token_id: &str) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage.delete_by_token_id(token_id).await.map_err(Into::into)
    }

    async fn delete_by_code(&self, code_id: &str) -> OidcResult<()> {
        let storage = RequestObjectStorage::new(&self.pool);
        storage.delete_by_code(code_id).await.map_err(Into::into)
    }
}
