//! User type and storage trait.
//!
//! Defines the canonical user record and the interface for user
//! persistence. Implementations are provided by storage backends
//! (in-memory in this crate, PostgreSQL in `curalink-auth-postgres`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;

fn default_datetime() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Normalizes an email address for identity comparison.
///
/// Trims surrounding whitespace and lower-cases the whole address. Every
/// lookup and every stored row uses the normalized form; the email is the
/// sole correlation key with the identity provider.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// User Type
// =============================================================================

/// A canonical user record.
///
/// Exactly one user exists per normalized email; the binding is permanent.
/// Profile attributes (`display_name`, `picture_url`) are refreshed
/// opportunistically on login, but `id` and `email` never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier, generated at creation, immutable.
    pub id: Uuid,

    /// Normalized email address; unique across all users, immutable.
    pub email: String,

    /// Display name, refreshed on login.
    pub display_name: String,

    /// Profile picture URL, refreshed on login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,

    /// Role tags ("patient", "researcher"). Empty at creation; assigned
    /// exactly once by onboarding and immutable afterwards.
    #[serde(default)]
    pub roles: Vec<String>,

    /// When the user was created.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user with a generated id and normalized email.
    #[must_use]
    pub fn new(email: impl AsRef<str>, display_name: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email.as_ref()),
            display_name: display_name.into(),
            picture_url: None,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new user builder.
    #[must_use]
    pub fn builder(email: impl AsRef<str>, display_name: impl Into<String>) -> UserBuilder {
        UserBuilder::new(email, display_name)
    }

    /// Returns `true` if the user has a specific role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if onboarding has already assigned a role.
    #[must_use]
    pub fn has_any_role(&self) -> bool {
        !self.roles.is_empty()
    }
}

// =============================================================================
// User Builder
// =============================================================================

/// Builder for creating `User` instances.
pub struct UserBuilder {
    user: User,
}

impl UserBuilder {
    fn new(email: impl AsRef<str>, display_name: impl Into<String>) -> Self {
        Self {
            user: User::new(email, display_name),
        }
    }

    /// Sets the user id.
    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.user.id = id;
        self
    }

    /// Sets the picture URL.
    #[must_use]
    pub fn picture_url(mut self, url: impl Into<String>) -> Self {
        self.user.picture_url = Some(url.into());
        self
    }

    /// Sets the roles.
    #[must_use]
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.user.roles = roles;
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn add_role(mut self, role: impl Into<String>) -> Self {
        self.user.roles.push(role.into());
        self
    }

    /// Builds the user.
    #[must_use]
    pub fn build(self) -> User {
        self.user
    }
}

// =============================================================================
// User Store Trait
// =============================================================================

/// Storage operations for users.
///
/// Implementations must enforce email uniqueness at the storage layer
/// (unique index or equivalent), never with an application-level
/// check-then-insert: under concurrent first-logins for the same email,
/// exactly one `create` may succeed and the others must fail with a
/// conflict the caller can recover from.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by their unique id.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>>;

    /// Find a user by normalized email.
    ///
    /// Callers must pass an already-normalized address (see
    /// [`normalize_email`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if a user with the same email already
    /// exists (unique-constraint violation), or any other storage failure.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Update a user's mutable profile attributes.
    ///
    /// Only `display_name`, `picture_url`, and `updated_at` change; `id`
    /// and `email` are never altered.
    ///
    /// # Errors
    ///
    /// Returns an error if the user doesn't exist or the update fails.
    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: &str,
        picture_url: Option<&str>,
    ) -> AuthResult<()>;

    /// Assign the user's roles exactly once.
    ///
    /// The write is conditional on the current role list being empty, so
    /// two racing assignments cannot both succeed; the loser gets a
    /// conflict even if it carried the same roles.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if roles were already assigned, or an
    /// error if the user doesn't exist or the update fails.
    async fn assign_roles(&self, user_id: Uuid, roles: &[String]) -> AuthResult<()>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("User@Example.COM"), "user@example.com");
        assert_eq!(normalize_email("  a@x.com  "), "a@x.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn test_user_new_normalizes_email() {
        let user = User::new(" Jane.Doe@Example.com ", "Jane Doe");
        assert_eq!(user.email, "jane.doe@example.com");
        assert_eq!(user.display_name, "Jane Doe");
        assert!(user.roles.is_empty());
        assert!(user.picture_url.is_none());
    }

    #[test]
    fn test_user_builder() {
        let user = User::builder("pat@example.com", "Pat")
            .picture_url("https://img.example.com/pat.png")
            .add_role("patient")
            .build();

        assert_eq!(user.email, "pat@example.com");
        assert_eq!(
            user.picture_url,
            Some("https://img.example.com/pat.png".to_string())
        );
        assert!(user.has_role("patient"));
        assert!(!user.has_role("researcher"));
        assert!(user.has_any_role());
    }

    #[test]
    fn test_user_ids_are_unique() {
        let a = User::new("a@x.com", "A");
        let b = User::new("b@x.com", "B");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_user_serialization() {
        let user = User::builder("pat@example.com", "Pat")
            .add_role("patient")
            .build();

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "pat@example.com");
        assert_eq!(json["displayName"], "Pat");
        assert_eq!(json["roles"][0], "patient");
        // picture_url is None and must be omitted
        assert!(json.get("pictureUrl").is_none());

        let roundtrip: User = serde_json::from_value(json).unwrap();
        assert_eq!(roundtrip.id, user.id);
        assert_eq!(roundtrip.email, user.email);
    }
}
