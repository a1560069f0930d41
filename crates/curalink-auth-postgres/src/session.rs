//! Session storage.
//!
//! Stores application sessions in the `auth_session` table, keyed by the
//! opaque token. Rows outlive their expiry until a resolve rejects them
//! or the background sweep deletes them.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use curalink_auth::Session;

use crate::{PgPool, StorageError, StorageResult};

type SessionTuple = (String, Uuid, OffsetDateTime, OffsetDateTime);

fn session_from_tuple(row: SessionTuple) -> Session {
    Session {
        token: row.0,
        user_id: row.1,
        created_at: row.2,
        expires_at: row.3,
    }
}

/// Session storage operations.
pub struct SessionStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionStorage<'a> {
    /// Create a new session storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new session.
    ///
    /// A token collision (primary-key violation) surfaces as a database
    /// error and is logged as anomalous: a repeating 256-bit token points
    /// at the RNG, not at the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, session: &Session) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO auth_session (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                tracing::error!("session token collision");
            }
            StorageError::from(e)
        })?;

        Ok(())
    }

    /// Find a session by token, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(&self, token: &str) -> StorageResult<Option<Session>> {
        let row: Option<SessionTuple> = query_as(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM auth_session
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(session_from_tuple))
    }

    /// Delete a session by token. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, token: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM auth_session WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions for a user. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_for_user(&self, user_id: Uuid) -> StorageResult<u64> {
        let result = query("DELETE FROM auth_session WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete all expired sessions. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_expired(&self) -> StorageResult<u64> {
        let result = query("DELETE FROM auth_session WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::debug!(deleted, "swept expired sessions");
        }
        Ok(deleted)
    }
}
