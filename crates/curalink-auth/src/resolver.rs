//! Session resolution.
//!
//! Turns a presented token into the authenticated user, applying lazy
//! expiry. All rejection paths collapse to the same client-facing denial
//! at the HTTP layer; the distinct variants here exist for logs only.

use std::sync::Arc;

use crate::error::AuthError;
use crate::session::Session;
use crate::storage::{SessionStore, User, UserStore};
use crate::AuthResult;

/// Resolves session tokens to users.
pub struct SessionResolver {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
}

impl SessionResolver {
    /// Creates a resolver over the user and session stores.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { users, sessions }
    }

    /// The user store backing this resolver.
    #[must_use]
    pub fn user_store(&self) -> Arc<dyn UserStore> {
        self.users.clone()
    }

    /// Authenticates a token and returns the user it belongs to.
    ///
    /// Expired sessions are rejected and deleted on the spot, so a token
    /// is unusable the moment its expiry passes regardless of when the
    /// background sweep last ran. A session whose user row has vanished is
    /// treated as invalid and cleaned up the same way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` for unknown tokens,
    /// `AuthError::SessionExpired` for expired ones, and storage errors
    /// unchanged.
    pub async fn authenticate(&self, token: &str) -> AuthResult<User> {
        let session = self.resolve_session(token).await?;

        match self.users.find_by_id(session.user_id).await? {
            Some(user) => Ok(user),
            None => {
                // Orphaned session: the user row is gone.
                tracing::warn!(user_id = %session.user_id, "session references missing user");
                let _ = self.sessions.delete(token).await;
                Err(AuthError::unauthorized("session references missing user"))
            }
        }
    }

    /// Resolves a token to a live session, applying lazy expiry.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`authenticate`](Self::authenticate).
    pub async fn resolve_session(&self, token: &str) -> AuthResult<Session> {
        if token.is_empty() {
            return Err(AuthError::unauthorized("no session token presented"));
        }

        let Some(session) = self.sessions.find_by_token(token).await? else {
            return Err(AuthError::unauthorized("unknown session token"));
        };

        if session.is_expired() {
            // Opportunistic cleanup; failure to delete doesn't change the
            // outcome, the token is rejected either way.
            if let Err(e) = self.sessions.delete(token).await {
                tracing::warn!("failed to delete expired session: {}", e);
            }
            return Err(AuthError::SessionExpired);
        }

        Ok(session)
    }

    /// Invalidates a session by token. Absent tokens are a no-op, which
    /// makes logout idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn invalidate(&self, token: &str) -> AuthResult<bool> {
        let deleted = self.sessions.delete(token).await?;
        if deleted {
            tracing::debug!("session invalidated");
        }
        Ok(deleted)
    }
}
