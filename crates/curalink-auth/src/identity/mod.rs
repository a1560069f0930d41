//! Identity verification against external providers.
//!
//! A verifier takes an opaque [`Assertion`] supplied by the client,
//! validates it with the external identity provider, and returns the
//! attested [`VerifiedIdentity`]. Verification is binary: anything other
//! than a fully attested identity is an error, and no downstream code
//! runs on failure.

pub mod google;
pub mod session_data;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

pub use google::GoogleVerifier;
pub use session_data::SessionDataVerifier;

// =============================================================================
// Assertion
// =============================================================================

/// Client-supplied proof of identity, passed through unmodified to the
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assertion {
    /// OAuth authorization code obtained by the frontend.
    #[serde(rename_all = "camelCase")]
    AuthorizationCode {
        code: String,
        redirect_uri: String,
    },

    /// Reference to a session already established with the provider,
    /// introspected server-side.
    #[serde(rename_all = "camelCase")]
    ProviderSession { session_id: String },
}

// =============================================================================
// Verified Identity
// =============================================================================

/// Identity attributes attested by the provider after successful
/// verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    /// Email address as reported by the provider. Callers normalize it
    /// before using it as a correlation key.
    pub email: String,

    /// Whether the provider attests ownership of the email. Verifiers
    /// only return identities with this set; it is kept on the type so
    /// the invariant is visible at the seam.
    pub email_verified: bool,

    /// Human-readable display name.
    pub display_name: String,

    /// Profile picture URL, if the provider supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

// =============================================================================
// Verifier Trait
// =============================================================================

/// Verifies an assertion with an external identity provider.
///
/// Implementations must treat the provider as untrusted input: network
/// failures, non-success statuses, and malformed payloads all map to
/// errors, never to a partially populated identity. An identity whose
/// email the provider does not attest as verified is rejected.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify an assertion and return the attested identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityVerification` when the provider rejects
    /// the assertion or the response is unusable, and
    /// `AuthError::Unavailable` when the provider cannot be reached.
    async fn verify(&self, assertion: &Assertion) -> AuthResult<VerifiedIdentity>;
}
