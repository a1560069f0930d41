//! In-memory storage backend.
//!
//! Backs development servers and tests. Uniqueness guarantees (one user
//! per email, one session per token) hold because the maps are keyed by
//! the unique attribute and mutations take a write lock for the whole
//! check-and-insert.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::Session;
use crate::storage::session::SessionStore;
use crate::storage::user::{User, UserStore};
use crate::AuthResult;

/// In-memory implementation of [`UserStore`] and [`SessionStore`].
#[derive(Default)]
pub struct MemoryAuthStorage {
    /// Users keyed by id.
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    /// Normalized email -> user id.
    emails: Arc<RwLock<HashMap<String, Uuid>>>,
    /// Sessions keyed by token.
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemoryAuthStorage {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users currently stored.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Number of sessions currently stored, including expired ones that
    /// have not yet been swept.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryAuthStorage {
    async fn find_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let emails = self.emails.read().await;
        let Some(id) = emails.get(email).copied() else {
            return Ok(None);
        };
        drop(emails);
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        // Lock order: emails then users, matching no other path that holds
        // both, so the whole insert is atomic with respect to lookups.
        let mut emails = self.emails.write().await;
        if emails.contains_key(&user.email) {
            return Err(AuthError::conflict(format!(
                "user with email '{}' already exists",
                user.email
            )));
        }
        emails.insert(user.email.clone(), user.id);
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: &str,
        picture_url: Option<&str>,
    ) -> AuthResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AuthError::storage(format!("user not found: {user_id}")))?;
        user.display_name = display_name.to_string();
        if let Some(url) = picture_url {
            user.picture_url = Some(url.to_string());
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn assign_roles(&self, user_id: Uuid, roles: &[String]) -> AuthResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AuthError::storage(format!("user not found: {user_id}")))?;
        if !user.roles.is_empty() {
            return Err(AuthError::conflict("role already assigned"));
        }
        user.roles = roles.to_vec();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryAuthStorage {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token) {
            // A 256-bit token repeating means the RNG is broken, not the client.
            tracing::error!("session token collision");
            return Err(AuthError::storage("session token collision"));
        }
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<Session>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> AuthResult<bool> {
        Ok(self.sessions.write().await.remove(token).is_some())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_user(email: &str) -> User {
        User::new(email, "Test User")
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let storage = MemoryAuthStorage::new();
        let user = create_test_user("pat@example.com");

        UserStore::create(&storage, &user).await.unwrap();

        let by_id = storage.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "pat@example.com");

        let by_email = storage
            .find_by_email("pat@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let storage = MemoryAuthStorage::new();
        UserStore::create(&storage, &create_test_user("pat@example.com"))
            .await
            .unwrap();

        let err = UserStore::create(&storage, &create_test_user("pat@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
        assert_eq!(storage.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let storage = MemoryAuthStorage::new();
        let user = create_test_user("pat@example.com");
        UserStore::create(&storage, &user).await.unwrap();

        storage
            .update_profile(user.id, "New Name", Some("https://img/p.png"))
            .await
            .unwrap();

        let updated = storage.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(updated.display_name, "New Name");
        assert_eq!(updated.picture_url, Some("https://img/p.png".to_string()));
        // Identity never changes
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.email, user.email);
    }

    #[tokio::test]
    async fn test_update_profile_missing_user() {
        let storage = MemoryAuthStorage::new();
        let err = storage
            .update_profile(Uuid::new_v4(), "Name", None)
            .await
            .unwrap_err();
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_assign_roles() {
        let storage = MemoryAuthStorage::new();
        let user = create_test_user("pat@example.com");
        UserStore::create(&storage, &user).await.unwrap();

        storage
            .assign_roles(user.id, &["patient".to_string()])
            .await
            .unwrap();

        let updated = storage.find_by_id(user.id).await.unwrap().unwrap();
        assert!(updated.has_role("patient"));
    }

    #[tokio::test]
    async fn test_assign_roles_only_once() {
        let storage = MemoryAuthStorage::new();
        let user = create_test_user("pat@example.com");
        UserStore::create(&storage, &user).await.unwrap();

        storage
            .assign_roles(user.id, &["patient".to_string()])
            .await
            .unwrap();

        // Same role again still conflicts; the choice is permanent.
        let err = storage
            .assign_roles(user.id, &["patient".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_role_assignments_admit_one_winner() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let user = create_test_user("pat@example.com");
        UserStore::create(storage.as_ref(), &user).await.unwrap();

        let mut handles = Vec::new();
        for role in ["patient", "researcher"] {
            for _ in 0..4 {
                let storage = storage.clone();
                let user_id = user.id;
                handles.push(tokio::spawn(async move {
                    storage.assign_roles(user_id, &[role.to_string()]).await
                }));
            }
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let stored = storage.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.roles.len(), 1);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let storage = MemoryAuthStorage::new();
        let session = Session::new(Uuid::new_v4(), Duration::from_secs(3600));

        SessionStore::create(&storage, &session).await.unwrap();
        let found = storage
            .find_by_token(&session.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, session.user_id);

        assert!(storage.delete(&session.token).await.unwrap());
        assert!(!storage.delete(&session.token).await.unwrap());
        assert!(storage.find_by_token(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_collision_rejected() {
        let storage = MemoryAuthStorage::new();
        let session = Session::new(Uuid::new_v4(), Duration::from_secs(3600));
        SessionStore::create(&storage, &session).await.unwrap();

        let err = SessionStore::create(&storage, &session).await.unwrap_err();
        assert!(err.to_string().contains("collision"));
        // The anomaly is ours, never the client's fault.
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_delete_for_user() {
        let storage = MemoryAuthStorage::new();
        let user_id = Uuid::new_v4();
        let other = Uuid::new_v4();

        for _ in 0..3 {
            SessionStore::create(&storage, &Session::new(user_id, Duration::from_secs(60)))
                .await
                .unwrap();
        }
        SessionStore::create(&storage, &Session::new(other, Duration::from_secs(60)))
            .await
            .unwrap();

        assert_eq!(storage.delete_for_user(user_id).await.unwrap(), 3);
        assert_eq!(storage.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let storage = MemoryAuthStorage::new();
        let live = Session::new(Uuid::new_v4(), Duration::from_secs(3600));
        let mut dead = Session::new(Uuid::new_v4(), Duration::from_secs(3600));
        dead.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);

        SessionStore::create(&storage, &live).await.unwrap();
        SessionStore::create(&storage, &dead).await.unwrap();

        assert_eq!(storage.delete_expired().await.unwrap(), 1);
        assert!(storage.find_by_token(&live.token).await.unwrap().is_some());
        assert!(storage.find_by_token(&dead.token).await.unwrap().is_none());
    }
}
