//! User storage.
//!
//! Stores canonical user records in the `auth_user` table. The unique
//! index on `email` is the arbiter for concurrent first-logins; inserts
//! that lose the race surface as `StorageError::Conflict`.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use curalink_auth::storage::User;

use crate::{PgPool, StorageError, StorageResult};

type UserTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    Vec<String>,
    OffsetDateTime,
    OffsetDateTime,
);

fn user_from_tuple(row: UserTuple) -> User {
    User {
        id: row.0,
        email: row.1,
        display_name: row.2,
        picture_url: row.3,
        roles: row.4,
        created_at: row.5,
        updated_at: row.6,
    }
}

/// User storage operations.
pub struct UserStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStorage<'a> {
    /// Create a new user storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, user_id: Uuid) -> StorageResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, email, display_name, picture_url, roles, created_at, updated_at
            FROM auth_user
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(user_from_tuple))
    }

    /// Find a user by normalized email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, email, display_name, picture_url, roles, created_at, updated_at
            FROM auth_user
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(user_from_tuple))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a user with the same email
    /// already exists, or any other database error.
    pub async fn create(&self, user: &User) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO auth_user (id, email, display_name, picture_url, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.picture_url)
        .bind(&user.roles)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::conflict(format!(
                    "user with email '{}' already exists",
                    user.email
                ));
            }
            StorageError::from(e)
        })?;

        Ok(())
    }

    /// Update a user's mutable profile attributes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user doesn't exist, or any
    /// database error.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: &str,
        picture_url: Option<&str>,
    ) -> StorageResult<()> {
        let result = query(
            r#"
            UPDATE auth_user
            SET display_name = $2,
                picture_url = COALESCE($3, picture_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(picture_url)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("user {user_id}")));
        }
        Ok(())
    }

    /// Assign the user's roles exactly once.
    ///
    /// The update is conditional on the role list being empty, so racing
    /// assignments resolve in the database: one row wins, the rest see a
    /// conflict.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if roles were already assigned,
    /// `StorageError::NotFound` if the user doesn't exist, or any database
    /// error.
    pub async fn assign_roles(&self, user_id: Uuid, roles: &[String]) -> StorageResult<()> {
        let result = query(
            r#"
            UPDATE auth_user
            SET roles = $2,
                updated_at = NOW()
            WHERE id = $1 AND roles = '{}'
            "#,
        )
        .bind(user_id)
        .bind(roles)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(user_id).await? {
                Some(_) => Err(StorageError::conflict("role already assigned")),
                None => Err(StorageError::not_found(format!("user {user_id}"))),
            };
        }
        Ok(())
    }
}
