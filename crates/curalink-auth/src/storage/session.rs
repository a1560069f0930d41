//! Session storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::session::Session;

/// Storage operations for sessions.
///
/// The token is the primary key. Implementations must not overwrite an
/// existing token on `create`; token collisions are a storage error, not
/// a silent replace.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if a session with the same token already exists or
    /// the storage operation fails.
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Find a session by its token.
    ///
    /// Returns the session regardless of expiry; lazy-expiry checks are
    /// the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(&self, token: &str) -> AuthResult<Option<Session>>;

    /// Delete a session by token.
    ///
    /// Returns `true` if a session was deleted, `false` if no session with
    /// that token existed. Deleting an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, token: &str) -> AuthResult<bool>;

    /// Delete all sessions belonging to a user.
    ///
    /// Returns the number of sessions deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_for_user(&self, user_id: Uuid) -> AuthResult<u64>;

    /// Delete all expired sessions.
    ///
    /// Returns the number of sessions deleted. Used by the background
    /// sweep; correctness never depends on it because resolution applies
    /// lazy expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired(&self) -> AuthResult<u64>;
}
