//! PostgreSQL storage backend for curalink-auth.
//!
//! Provides persistent storage for:
//!
//! - Users, with email uniqueness enforced by a unique index
//! - Sessions, keyed by token with lazy plus swept expiry
//!
//! # Example
//!
//! ```ignore
//! use curalink_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/curalink").await?;
//! storage.ensure_schema().await?;
//! ```

pub mod session;
pub mod user;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use uuid::Uuid;

use curalink_auth::storage::{SessionStore, User, UserStore};
use curalink_auth::{AuthError, AuthResult, Session};

pub use session::SessionStorage;
pub use user::UserStorage;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StorageError {
    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if the wrapped database error is a unique-constraint
    /// violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        if let Self::Database(sqlx_core::Error::Database(db_err)) = self {
            db_err.is_unique_violation()
        } else {
            false
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(message) => AuthError::conflict(message),
            StorageError::NotFound(resource) => {
                AuthError::storage(format!("not found: {resource}"))
            }
            StorageError::Database(e) => AuthError::storage(e.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for authentication data.
///
/// Holds a connection pool and implements the `curalink-auth` storage
/// traits, so an `Arc<PostgresAuthStorage>` plugs directly into the
/// directory, issuer, and resolver.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
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
        let pool = PoolOptions::<Postgres>::new().connect(database_url).await?;
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

    /// Get user storage operations.
    #[must_use]
    pub fn users(&self) -> UserStorage<'_> {
        UserStorage::new(&self.pool)
    }

    /// Get session storage operations.
    #[must_use]
    pub fn sessions(&self) -> SessionStorage<'_> {
        SessionStorage::new(&self.pool)
    }

    /// Create the auth tables if they do not exist.
    ///
    /// The UNIQUE constraint on `auth_user.email` is what makes concurrent
    /// first-logins safe; application code relies on it rather than
    /// check-then-insert.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        sqlx_core::query::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_user (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                picture_url TEXT,
                roles TEXT[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx_core::query::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_session (
                token TEXT PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES auth_user(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx_core::query::query(
            "CREATE INDEX IF NOT EXISTS idx_auth_session_user_id ON auth_session (user_id)",
        )
        .execute(self.pool())
        .await?;

        sqlx_core::query::query(
            "CREATE INDEX IF NOT EXISTS idx_auth_session_expires_at ON auth_session (expires_at)",
        )
        .execute(self.pool())
        .await?;

        tracing::debug!("auth schema ensured");
        Ok(())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

#[async_trait]
impl UserStore for PostgresAuthStorage {
    async fn find_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users().find_by_id(user_id).await?)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.users().find_by_email(email).await?)
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        Ok(self.users().create(user).await?)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: &str,
        picture_url: Option<&str>,
    ) -> AuthResult<()> {
        Ok(self
            .users()
            .update_profile(user_id, display_name, picture_url)
            .await?)
    }

    async fn assign_roles(&self, user_id: Uuid, roles: &[String]) -> AuthResult<()> {
        Ok(self.users().assign_roles(user_id, roles).await?)
    }
}

#[async_trait]
impl SessionStore for PostgresAuthStorage {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        Ok(self.sessions().create(session).await?)
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<Session>> {
        Ok(self.sessions().find_by_token(token).await?)
    }

    async fn delete(&self, token: &str) -> AuthResult<bool> {
        Ok(self.sessions().delete(token).await?)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        Ok(self.sessions().delete_for_user(user_id).await?)
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        Ok(self.sessions().delete_expired().await?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_auth_conflict() {
        let err: AuthError = StorageError::conflict("user with email 'a@b.c' already exists").into();
        assert!(matches!(err, AuthError::Conflict { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_not_found_maps_to_storage_error() {
        let err: AuthError = StorageError::not_found("user 42").into();
        assert!(matches!(err, AuthError::Storage { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_is_conflict_predicate() {
        assert!(StorageError::conflict("dup").is_conflict());
        assert!(!StorageError::not_found("x").is_conflict());
    }
}
