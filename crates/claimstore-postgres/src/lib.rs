//! PostgreSQL storage backend for claimstore
//!
//! Provides persistent storage for OIDC request objects:
//!
//! - Request object references (the record anchoring one request object to
//!   its current lifecycle handle: session key, code id, or token id)
//! - Requested claims, owned by a reference and cascade-deleted with it
//! - Enumerated claim values, owned by a claim
//!
//! # Example
//!
//! ```ignore
//! use claimstore_postgres::PostgresClaimStorage;
//!
//! // Create storage with connection pool
//! let storage = PostgresClaimStorage::connect("postgres://localhost/idp").await?;
//! storage.request_objects().create_tables_if_not_exists().await?;
//!
//! // Persist a request object keyed by its session data key
//! storage
//!     .request_objects()
//!     .insert("clientA", "sk1", &claim_groups)
//!     .await?;
//! ```

pub mod adapter;
pub mod request_object;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use adapter::ArcRequestObjectStorage;
pub use request_object::RequestObjectStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during request-object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed. Carries a description of the operation
    /// that was being executed.
    #[error("{context}: {source}")]
    Database {
        /// What the storage layer was doing when the failure occurred.
        context: String,
        /// The underlying database error.
        #[source]
        source: sqlx_core::Error,
    },

    /// An opaque token could not be resolved to an internal token id.
    #[error("Token lookup failed: {0}")]
    TokenLookup(String),
}

impl StorageError {
    /// Wrap a database error with an operation description.
    #[must_use]
    pub fn database(context: impl Into<String>, source: sqlx_core::Error) -> Self {
        Self::Database {
            context: context.into(),
            source,
        }
    }

    /// Create a `TokenLookup` error.
    #[must_use]
    pub fn token_lookup(message: impl Into<String>) -> Self {
        Self::TokenLookup(message.into())
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database { .. })
    }

    /// Returns `true` if this is a token lookup error.
    #[must_use]
    pub fn is_token_lookup(&self) -> bool {
        matches!(self, Self::TokenLookup(_))
    }
}

impl From<StorageError> for claimstore::OidcError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database { .. } => claimstore::OidcError::storage(err.to_string()),
            StorageError::TokenLookup(message) => claimstore::OidcError::token_lookup(message),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Claim Storage
// =============================================================================

/// PostgreSQL storage backend for request-object data.
///
/// Holds a connection pool and hands out the specialized storage type for
/// request objects. Connection acquisition and release are scoped to each
/// operation through the pool.
#[derive(Debug, Clone)]
pub struct PostgresClaimStorage {
    pool: Arc<PgPool>,
}

impl PostgresClaimStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .connect(database_url)
            .await
            .map_err(|e| StorageError::database("connecting to database", e))?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the Arc-wrapped pool.
    #[must_use]
    pub fn pool_arc(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Get request-object storage operations.
    #[must_use]
    pub fn request_objects(&self) -> RequestObjectStorage<'_> {
        RequestObjectStorage::new(&self.pool)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_database_context() {
        let err = StorageError::database(
            "storing request object reference",
            sqlx_core::Error::PoolClosed,
        );
        assert!(err.is_database_error());
        assert!(!err.is_token_lookup());
        assert!(
            err.to_string()
                .starts_with("storing request object reference: ")
        );
    }

    #[test]
    fn test_storage_error_token_lookup() {
        let err = StorageError::token_lookup("unknown token");
        assert!(err.is_token_lookup());
        assert_eq!(err.to_string(), "Token lookup failed: unknown token");
    }

    #[test]
    fn test_storage_error_maps_to_domain_error() {
        let err: claimstore::OidcError = StorageError::token_lookup("unknown token").into();
        assert!(err.is_token_lookup());

        let err: claimstore::OidcError =
            StorageError::database("retrieving requested claims", sqlx_core::Error::PoolClosed)
                .into();
        assert!(err.is_storage());
    }
}
