//! Session types and token generation.
//!
//! A session binds an internally minted opaque token to exactly one user
//! for a fixed time window.
//!
//! # Lifecycle
//!
//! 1. Session created when a login completes identity verification
//! 2. Resolved on every protected request
//! 3. Deleted on logout, at expiry, or when superseded by a new login
//!
//! # Security
//!
//! - Tokens are 256 bits of cryptographically secure randomness
//! - Tokens are minted by this service, never adopted from the identity
//!   provider (a provider may reuse its own token across distinct logins)
//! - Expiry is fixed at creation; there is no sliding extension

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A login session stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque session token (unique, 256-bit random, base64url-encoded).
    pub token: String,

    /// Owning user. A token denotes exactly one user for its lifetime.
    pub user_id: Uuid,

    /// Timestamp when the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the session expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Creates a new session for a user with the given time-to-live.
    ///
    /// A fresh token is always minted; callers never supply one.
    #[must_use]
    pub fn new(user_id: Uuid, ttl: std::time::Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            token: Self::generate_token(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Generates a new cryptographically secure session token.
    ///
    /// The token is 256 bits (32 bytes) of random data, encoded as
    /// base64url without padding (43 characters). This comfortably exceeds
    /// the 122-bit minimum required to make brute-force guessing
    /// infeasible.
    #[must_use]
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the session has expired.
    ///
    /// Expired sessions must be treated as absent by resolution even when
    /// the row still physically exists.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Remaining lifetime in whole seconds, zero if already expired.
    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.expires_at - OffsetDateTime::now_utc();
        if remaining.is_negative() {
            0
        } else {
            remaining.whole_seconds() as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn create_test_session(expires_at: OffsetDateTime) -> Session {
        Session {
            token: Session::generate_token(),
            user_id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        }
    }

    #[test]
    fn test_generate_token_length() {
        let token = Session::generate_token();
        // 32 bytes = 256 bits, base64url encoded = 43 characters (no padding)
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn test_generate_token_is_base64url() {
        let token = Session::generate_token();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let tokens: Vec<String> = (0..100).map(|_| Session::generate_token()).collect();

        let mut unique = tokens.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(tokens.len(), unique.len());
    }

    #[test]
    fn test_new_session_ttl() {
        let ttl = std::time::Duration::from_secs(7 * 24 * 3600);
        let session = Session::new(Uuid::new_v4(), ttl);
        assert_eq!(session.expires_at - session.created_at, Duration::days(7));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_session_is_expired() {
        let now = OffsetDateTime::now_utc();

        let session = create_test_session(now + Duration::minutes(10));
        assert!(!session.is_expired());

        let session = create_test_session(now - Duration::minutes(1));
        assert!(session.is_expired());
    }

    #[test]
    fn test_remaining_secs() {
        let now = OffsetDateTime::now_utc();

        let session = create_test_session(now + Duration::hours(1));
        let remaining = session.remaining_secs();
        assert!(remaining > 3590 && remaining <= 3600);

        let session = create_test_session(now - Duration::hours(1));
        assert_eq!(session.remaining_secs(), 0);
    }

    #[test]
    fn test_session_serialization() {
        let session = create_test_session(OffsetDateTime::now_utc() + Duration::days(7));

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("userId"));
        assert!(json.contains("expiresAt"));

        let deserialized: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session.token, deserialized.token);
        assert_eq!(session.user_id, deserialized.user_id);
    }
}
