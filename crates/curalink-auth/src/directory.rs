//! User directory.
//!
//! Maps a verified identity to exactly one canonical user. The email is
//! the sole correlation key; uniqueness is enforced by the storage layer,
//! and a lost insert race is recovered by re-reading the winner's row.

use std::sync::Arc;

use crate::error::AuthError;
use crate::identity::VerifiedIdentity;
use crate::storage::{normalize_email, User, UserStore};
use crate::AuthResult;

/// Resolves verified identities to user records, creating them on first
/// login.
pub struct UserDirectory {
    users: Arc<dyn UserStore>,
}

impl UserDirectory {
    /// Creates a directory over a user store.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Returns the user for a verified identity, creating one if this is
    /// the identity's first login.
    ///
    /// On a repeat login the mutable profile attributes are refreshed from
    /// the identity; `id` and `email` never change. Under concurrent first
    /// logins for the same email, every caller converges on the single row
    /// the storage constraint let through.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` on persistence failures and
    /// `AuthError::Conflict` if a duplicate row is detected but the winner
    /// cannot be read back.
    pub async fn resolve_or_create(&self, identity: &VerifiedIdentity) -> AuthResult<User> {
        let email = normalize_email(&identity.email);

        if let Some(existing) = self.users.find_by_email(&email).await? {
            return self.refresh_profile(existing, identity).await;
        }

        let mut user = User::new(&email, identity.display_name.clone());
        user.picture_url = identity.picture_url.clone();

        match self.users.create(&user).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "created user on first login");
                Ok(user)
            }
            Err(AuthError::Conflict { .. }) => {
                // Lost a first-login race; converge on the winner's row.
                tracing::debug!(email_domain = email_domain(&email), "insert race lost, re-reading");
                match self.users.find_by_email(&email).await? {
                    Some(winner) => self.refresh_profile(winner, identity).await,
                    None => Err(AuthError::conflict(
                        "duplicate user detected but winning row not found",
                    )),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh_profile(
        &self,
        mut user: User,
        identity: &VerifiedIdentity,
    ) -> AuthResult<User> {
        let name_changed = user.display_name != identity.display_name;
        let picture_changed =
            identity.picture_url.is_some() && user.picture_url != identity.picture_url;

        if name_changed || picture_changed {
            self.users
                .update_profile(
                    user.id,
                    &identity.display_name,
                    identity.picture_url.as_deref(),
                )
                .await?;
            user.display_name = identity.display_name.clone();
            if let Some(url) = &identity.picture_url {
                user.picture_url = Some(url.clone());
            }
        }
        Ok(user)
    }
}

/// Domain part of an email, for logs that must not carry the local part.
fn email_domain(email: &str) -> &str {
    email.rsplit('@').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAuthStorage;

    fn test_identity(email: &str, name: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            email: email.to_string(),
            email_verified: true,
            display_name: name.to_string(),
            picture_url: None,
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_user() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let directory = UserDirectory::new(storage.clone());

        let user = directory
            .resolve_or_create(&test_identity("Pat@Example.com", "Pat"))
            .await
            .unwrap();

        assert_eq!(user.email, "pat@example.com");
        assert_eq!(user.display_name, "Pat");
        assert_eq!(storage.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_repeat_login_resolves_same_user() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let directory = UserDirectory::new(storage.clone());

        let first = directory
            .resolve_or_create(&test_identity("pat@example.com", "Pat"))
            .await
            .unwrap();
        let second = directory
            .resolve_or_create(&test_identity("PAT@example.com", "Pat"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(storage.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_repeat_login_refreshes_profile() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let directory = UserDirectory::new(storage.clone());

        let first = directory
            .resolve_or_create(&test_identity("pat@example.com", "Pat"))
            .await
            .unwrap();

        let mut updated = test_identity("pat@example.com", "Patricia");
        updated.picture_url = Some("https://img.example.com/p.png".to_string());
        let second = directory.resolve_or_create(&updated).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name, "Patricia");
        assert_eq!(
            second.picture_url,
            Some("https://img.example.com/p.png".to_string())
        );

        let stored = storage.find_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Patricia");
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_converge() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let directory = Arc::new(UserDirectory::new(storage.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory
                    .resolve_or_create(&test_identity("pat@example.com", "Pat"))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(storage.user_count().await, 1);
    }
}
