//! Hosted-session identity verification.
//!
//! Introspects a provider-managed session by its id and extracts the
//! attested identity from the returned session data. Any token material
//! in the provider's response is discarded; the application mints its own
//! session credential after verification.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::AuthResult;

use super::{Assertion, IdentityVerifier, VerifiedIdentity};

const PROVIDER: &str = "session-data";

/// Session-data document returned by the hosting provider. Only the user
/// block matters; everything else (including any `session_token`) is
/// ignored.
#[derive(Debug, Deserialize)]
struct SessionData {
    user: Option<SessionUser>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies provider-session assertions against a hosted session-data
/// endpoint.
pub struct SessionDataVerifier {
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl SessionDataVerifier {
    /// Creates a verifier from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be
    /// built or the session-data endpoint is missing.
    pub fn new(config: ProviderConfig) -> AuthResult<Self> {
        if config.session_data_url.is_empty() {
            return Err(AuthError::configuration(
                "provider.session_data_url is required for the session-data provider",
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
}

#[async_trait]
impl IdentityVerifier for SessionDataVerifier {
    async fn verify(&self, assertion: &Assertion) -> AuthResult<VerifiedIdentity> {
        let Assertion::ProviderSession { session_id } = assertion else {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "expected a provider session assertion",
            ));
        };

        if session_id.trim().is_empty() {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "empty session id",
            ));
        }

        let response = self
            .http_client
            .get(&self.config.session_data_url)
            .header("X-Session-ID", session_id)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("session-data endpoint unreachable: {}", e);
                AuthError::unavailable(format!("identity provider unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::debug!(status = %status, "session introspection rejected");
            return Err(AuthError::identity_verification(
                PROVIDER,
                format!("session introspection failed with status {status}"),
            ));
        }

        let data: SessionData = response.json().await.map_err(|e| {
            AuthError::identity_verification(
                PROVIDER,
                format!("malformed session-data response: {e}"),
            )
        })?;

        let Some(user) = data.user else {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "session data has no user block",
            ));
        };

        let Some(email) = user.email.filter(|e| !e.trim().is_empty()) else {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "session data missing email",
            ));
        };

        if !user.email_verified {
            return Err(AuthError::identity_verification(
                PROVIDER,
                "email is not verified by the provider",
            ));
        }

        let display_name = user
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        Ok(VerifiedIdentity {
            email,
            email_verified: true,
            display_name,
            picture_url: user.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_verifier(server: &MockServer) -> SessionDataVerifier {
        let config = ProviderConfig {
            kind: "session-data".to_string(),
            session_data_url: format!("{}/session-data", server.uri()),
            ..ProviderConfig::default()
        };
        SessionDataVerifier::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_verify_success_and_ignores_provider_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/session-data"))
            .and(header("X-Session-ID", "sess-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_token": "provider-token-that-must-not-leak",
                "user": {
                    "email": "pat@example.com",
                    "email_verified": true,
                    "name": "Pat"
                }
            })))
            .mount(&server)
            .await;

        let verifier = create_test_verifier(&server);
        let identity = verifier
            .verify(&Assertion::ProviderSession {
                session_id: "sess-42".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(identity.email, "pat@example.com");
        assert_eq!(identity.display_name, "Pat");
        // The identity carries no credential material of any kind.
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("provider-token"));
    }

    #[tokio::test]
    async fn test_verify_unknown_session_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/session-data"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let verifier = create_test_verifier(&server);
        let err = verifier
            .verify(&Assertion::ProviderSession {
                session_id: "missing".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_authentication_error());
    }

    #[tokio::test]
    async fn test_verify_missing_user_block_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/session-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"other": true})))
            .mount(&server)
            .await;

        let verifier = create_test_verifier(&server);
        let err = verifier
            .verify(&Assertion::ProviderSession {
                session_id: "sess-42".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_authentication_error());
    }

    #[tokio::test]
    async fn test_verify_empty_session_id_rejected() {
        let server = MockServer::start().await;
        let verifier = create_test_verifier(&server);

        let err = verifier
            .verify(&Assertion::ProviderSession {
                session_id: "  ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_authentication_error());
    }

    #[test]
    fn test_new_requires_endpoint() {
        let config = ProviderConfig {
            kind: "session-data".to_string(),
            session_data_url: String::new(),
            ..ProviderConfig::default()
        };
        assert!(SessionDataVerifier::new(config).is_err());
    }
}
