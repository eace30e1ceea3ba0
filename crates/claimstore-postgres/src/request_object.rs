//! Request object reference, claim, and claim-value storage.
//!
//! One reference row anchors each request object. It is created under the
//! transient session data key, rebound to the authorization code id when a
//! code is minted, rebound to the access token id at the code-to-token
//! exchange, and rotated to the new token id on refresh. Claims and their
//! enumerated values hang off the reference and are cascade-deleted with it.
//!
//! Every multi-statement operation runs inside one transaction: a mid-way
//! failure rolls the whole sequence back, so no reference is ever reachable
//! with a partial claim set.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use tracing::{debug, info, instrument};

use claimstore::{AccessTokenResolver, ClaimSurface, RequestedClaim};

use crate::{PgPool, StorageError, StorageResult};

/// Wrap a database error with the operation that was running.
fn db_err(context: &'static str) -> impl FnOnce(sqlx_core::Error) -> StorageError {
    move |source| StorageError::database(context, source)
}

// =============================================================================
// Request Object Storage
// =============================================================================

/// Request-object storage operations.
///
/// Manages the three-tier record set (reference, claims, claim values) in
/// PostgreSQL. Rebind and delete operations affecting zero rows succeed as
/// no-ops; callers may race cleanups against flows that already completed.
pub struct RequestObjectStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> RequestObjectStorage<'a> {
    /// Create a new request-object storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a request object and its full claim tree.
    ///
    /// Inserts the reference row keyed by `session_data_key`, then every
    /// claim from every group in order, then the enumerated values of each
    /// claim as one batched statement per claim. The whole sequence is one
    /// transaction committed at the end.
    ///
    /// Claims with an unrecognized request type carry no surface
    /// discriminator; they are stored but excluded from surface-filtered
    /// retrieval.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails. Nothing is persisted in that
    /// case.
    #[instrument(skip(self, claim_groups), fields(consumer_key = %consumer_key))]
    pub async fn insert(
        &self,
        consumer_key: &str,
        session_data_key: &str,
        claim_groups: &[Vec<RequestedClaim>],
    ) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("opening request object transaction"))?;

        let reference_id: i64 = query_scalar(
            r#"
            INSERT INTO oidc_req_object_ref (session_data_key, consumer_key)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(session_data_key)
        .bind(consumer_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("storing request object reference"))?;

        let mut claim_count = 0u64;
        for claim in claim_groups.iter().flatten() {
            let claim_id: i64 = query_scalar(
                r#"
                INSERT INTO oidc_req_object_claims
                    (ref_id, claim_name, is_essential, claim_value, is_user_info)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(reference_id)
            .bind(&claim.name)
            .bind(claim.essential)
            .bind(claim.value.as_deref())
            .bind(claim.surface.map(ClaimSurface::is_user_info))
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("storing request object claim"))?;

            if !claim.values.is_empty() {
                query(
                    r#"
                    INSERT INTO oidc_req_object_claim_values (claim_id, claim_value)
                    SELECT $1, v FROM UNNEST($2::text[]) AS t(v)
                    "#,
                )
                .bind(claim_id)
                .bind(&claim.values)
                .execute(&mut *tx)
                .await
                .map_err(db_err("storing request object claim values"))?;
            }
            claim_count += 1;
        }

        tx.commit()
            .await
            .map_err(db_err("committing request object"))?;

        info!(
            reference_id,
            claim_count, "Stored request object reference and claims"
        );

        Ok(())
    }

    /// Rebind the reference matching `session_data_key` to a code id,
    /// clearing any token id.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails. Zero matched rows is a no-op.
    #[instrument(skip(self))]
    pub async fn rebind_by_code(
        &self,
        session_data_key: &str,
        code_id: &str,
    ) -> StorageResult<()> {
        let rows_affected = query(
            r#"
            UPDATE oidc_req_object_ref
            SET code_id = $1, token_id = NULL
            WHERE session_data_key = $2
            "#,
        )
        .bind(code_id)
        .bind(session_data_key)
        .execute(self.pool)
        .await
        .map_err(db_err("rebinding request object reference to code"))?
        .rows_affected();

        if rows_affected > 0 {
            info!(code_id, "Rebound request object reference to code");
        }

        Ok(())
    }

    /// Rebind the reference matching `session_data_key` directly to an
    /// access token id, clearing any code id. Used when a token is issued
    /// without a prior code.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails. Zero matched rows is a no-op.
    #[instrument(skip(self))]
    pub async fn rebind_by_token(
        &self,
        session_data_key: &str,
        token_id: &str,
    ) -> StorageResult<()> {
        let rows_affected = query(
            r#"
            UPDATE oidc_req_object_ref
            SET code_id = NULL, token_id = $1
            WHERE session_data_key = $2
            "#,
        )
        .bind(token_id)
        .bind(session_data_key)
        .execute(self.pool)
        .await
        .map_err(db_err("rebinding request object reference to token"))?
        .rows_affected();

        if rows_affected > 0 {
            info!(token_id, "Rebound request object reference to token");
        }

        Ok(())
    }

    /// The code-to-token exchange.
    ///
    /// In one transaction: locate the reference bound to `code_id`, delete
    /// any stale reference already bound to `token_id` (a token id is bound
    /// to at most one reference), then rewrite the located reference to
    /// carry `token_id` with the code id cleared. When no reference carries
    /// `code_id` the call is a no-op, so a retry after success leaves
    /// exactly one reference bound to `token_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup delete or the rewrite fails; the
    /// transaction aborts and the rewrite is never applied without the
    /// cleanup.
    #[instrument(skip(self))]
    pub async fn rebind_code_to_token(&self, code_id: &str, token_id: &str) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("opening code-to-token transaction"))?;

        let reference_id: Option<i64> = query_scalar(
            r#"
            SELECT id FROM oidc_req_object_ref WHERE code_id = $1
            "#,
        )
        .bind(code_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("locating request object reference for code"))?;

        let Some(reference_id) = reference_id else {
            debug!(code_id, "No reference bound to code; rebind is a no-op");
            return Ok(());
        };

        let stale = query(
            r#"
            DELETE FROM oidc_req_object_ref WHERE token_id = $1 AND id <> $2
            "#,
        )
        .bind(token_id)
        .bind(reference_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err("deleting stale reference for token"))?
        .rows_affected();

        query(
            r#"
            UPDATE oidc_req_object_ref
            SET token_id = $1, code_id = NULL
            WHERE id = $2
            "#,
        )
        .bind(token_id)
        .bind(reference_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err("rewriting request object reference code to token"))?;

        tx.commit()
            .await
            .map_err(db_err("committing code-to-token rebind"))?;

        info!(
            reference_id,
            stale_deleted = stale,
            "Rebound request object reference from code to token"
        );

        Ok(())
    }

    /// Rotate the bound token id after a token refresh. The claim tree is
    /// untouched; the original consented claim set survives the refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails. Zero matched rows is a no-op.
    #[instrument(skip(self))]
    pub async fn refresh(&self, old_token_id: &str, new_token_id: &str) -> StorageResult<()> {
        let rows_affected = query(
            r#"
            UPDATE oidc_req_object_ref
            SET token_id = $1
            WHERE token_id = $2
            "#,
        )
        .bind(new_token_id)
        .bind(old_token_id)
        .execute(self.pool)
        .await
        .map_err(db_err("rotating request object token id"))?
        .rows_affected();

        if rows_affected > 0 {
            info!(new_token_id, "Rotated request object token binding");
        }

        Ok(())
    }

    /// Resolve `token` through the lookup contract and return the matching
    /// claims for `surface`.
    ///
    /// A token that resolves to nothing yields an empty vector; a lookup
    /// failure propagates as a lookup error.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the query fails.
    pub async fn claims_for_token(
        &self,
        resolver: &dyn AccessTokenResolver,
        token: &str,
        surface: ClaimSurface,
    ) -> StorageResult<Vec<RequestedClaim>> {
        let token_id = resolver
            .resolve_token_id(token)
            .await
            .map_err(|e| StorageError::token_lookup(e.to_string()))?;

        match token_id {
            Some(token_id) => self.find_claims_by_token_id(&token_id, surface).await,
            None => Ok(Vec::new()),
        }
    }

    /// Return the claims of the reference bound to `token_id`, filtered to
    /// `surface`, in insertion order.
    ///
    /// Claims stored without a discriminator never match either surface.
    /// Enumerated value sets are not materialized on retrieval; callers
    /// get the claim name, essential flag, and scalar value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_claims_by_token_id(
        &self,
        token_id: &str,
        surface: ClaimSurface,
    ) -> StorageResult<Vec<RequestedClaim>> {
        let rows: Vec<(String, bool, Option<String>)> = query_as(
            r#"
            SELECT c.claim_name, c.is_essential, c.claim_value
            FROM oidc_req_object_claims c
            JOIN oidc_req_object_ref r ON r.id = c.ref_id
            WHERE r.token_id = $1
              AND c.is_user_info = $2
            ORDER BY c.id
            "#,
        )
        .bind(token_id)
        .bind(surface.is_user_info())
        .fetch_all(self.pool)
        .await
        .map_err(db_err("retrieving requested claims"))?;

        Ok(rows
            .into_iter()
            .map(|(name, essential, value)| RequestedClaim {
                name,
                essential,
                value,
                values: Vec::new(),
                surface: Some(surface),
            })
            .collect())
    }

    /// Delete the reference bound to `token_id`; claims and claim values
    /// cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails. Zero matched rows is a no-op.
    #[instrument(skip(self))]
    pub async fn delete_by_token_id(&self, token_id: &str) -> StorageResult<()> {
        let rows_affected = query(
            r#"
            DELETE FROM oidc_req_object_ref WHERE token_id = $1
            "#,
        )
        .bind(token_id)
        .execute(self.pool)
        .await
        .map_err(db_err("deleting request object reference by token id"))?
        .rows_affected();

        if rows_affected > 0 {
            info!(token_id, "Deleted request object reference");
        }

        Ok(())
    }

    /// Delete the reference bound to `code_id`; claims and claim values
    /// cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails. Zero matched rows is a no-op.
    #[instrument(skip(self))]
    pub async fn delete_by_code(&self, code_id: &str) -> StorageResult<()> {
        let rows_affected = query(
            r#"
            DELETE FROM oidc_req_object_ref WHERE code_id = $1
            "#,
        )
        .bind(code_id)
        .execute(self.pool)
        .await
        .map_err(db_err("deleting request object reference by code id"))?
        .rows_affected();

        if rows_affected > 0 {
            info!(code_id, "Deleted request object reference");
        }

        Ok(())
    }

    /// Create the request-object tables and lookup indexes.
    /// Should be called during server bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    #[instrument(skip(self))]
    pub async fn create_tables_if_not_exists(&self) -> StorageResult<()> {
        query(
            r#"
            CREATE TABLE IF NOT EXISTS oidc_req_object_ref (
                id BIGSERIAL PRIMARY KEY,
                session_data_key TEXT,
                consumer_key TEXT NOT NULL,
                code_id TEXT,
                token_id TEXT
            )
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating request object reference table"))?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS oidc_req_object_claims (
                id BIGSERIAL PRIMARY KEY,
                ref_id BIGINT NOT NULL
                    REFERENCES oidc_req_object_ref(id) ON DELETE CASCADE,
                claim_name TEXT NOT NULL CHECK (claim_name <> ''),
                is_essential BOOLEAN NOT NULL DEFAULT FALSE,
                claim_value TEXT,
                is_user_info BOOLEAN
            )
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating request object claims table"))?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS oidc_req_object_claim_values (
                id BIGSERIAL PRIMARY KEY,
                claim_id BIGINT NOT NULL
                    REFERENCES oidc_req_object_claims(id) ON DELETE CASCADE,
                claim_value TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating request object claim values table"))?;

        // Lookup indexes, one per lifecycle handle
        query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_oidc_req_object_ref_session
            ON oidc_req_object_ref(session_data_key)
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating session key index"))?;

        query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_oidc_req_object_ref_code
            ON oidc_req_object_ref(code_id)
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating code id index"))?;

        query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_oidc_req_object_ref_token
            ON oidc_req_object_ref(token_id)
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating token id index"))?;

        query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_oidc_req_object_claims_ref
            ON oidc_req_object_claims(ref_id)
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating claims owner index"))?;

        query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_oidc_req_object_claim_values_claim
            ON oidc_req_object_claim_values(claim_id)
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(db_err("creating claim values owner index"))?;

        info!("Request object tables created");

        Ok(())
    }
}
