//! Google identity verification.
//!
//! Exchanges an OAuth authorization code for an access token, then fetches
//! the userinfo document and checks the email attestation. The provider's
//! access token is used for the one userinfo call and discarded; it never
//! becomes an application credential.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::AuthResult;

use super::{Assertion, IdentityVerifier, VerifiedIdentity};

const PROVIDER: &str = "google";

/// Token endpoint response, reduced to the fields we use.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Userinfo document, reduced to the fields we use.
#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies authorization-code assertions against Google's OAuth endpoints.
pub struct GoogleVerifier {
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl GoogleVerifier {
    /// Creates a verifier from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be
    /// built or required endpoints are missing.
    pub fn new(config: ProviderConfig) -> AuthResult<Self> {
        if config.userinfo_url.is_empty() {
            return Err(AuthError::configuration(
                "provider.userinfo_url is required for the google provider",
            ));
        }
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AuthResult<String> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("token endpoint unreachable: {}", e);
                AuthError::unavailable(format!("identity provider unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::debug!(status = %status, "token exchange rejected");
            return Err(AuthError::identity_verification(
                PROVIDER,
                format!("token exchange failed with status {status}"),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AuthError::identity_verification(PROVIDER, format!("malformed token response: {e}"))
        })?;
        Ok(token.access_token)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<UserInfo> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("userinfo endpoint unreachable: {}", e);
                AuthError::unavailable(format!("identity provider unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::identity_verification(
                PROVIDER,
                format!("userinfo request failed with status {status}"),
            ));
        }

        response.json().await.map_err(|e| {
            AuthError::identity_verification(PROVIDER, format!("malformed userinfo response: {e}"))
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, assertion: &Assertion) -> AuthResult<VerifiedIdentity> {
        let Assertion::AuthorizationCode { code, redirect_uri } = assertion else {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "expected an authorization code assertion",
            ));
        };

        let access_token = self.exchange_code(code, redirect_uri).await?;
        let info = self.fetch_userinfo(&access_token).await?;

        let Some(email) = info.email.filter(|e| !e.trim().is_empty()) else {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "userinfo response missing email",
            ));
        };

        if !info.email_verified {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "email is not verified by the provider",
            ));
        }

        let display_name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        Ok(VerifiedIdentity {
            email,
            email_verified: true,
            display_name,
            picture_url: info.picture,
        })
    }
}
