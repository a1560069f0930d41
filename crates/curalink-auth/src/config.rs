//! Authentication configuration.
//!
//! Configuration for the session/identity core: session lifetime and
//! cardinality policy, cookie attributes, and identity-provider settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth.session]
/// ttl = "7d"
/// policy = "single"
///
/// [auth.cookie]
/// name = "session_token"
/// same_site = "none"
///
/// [auth.provider]
/// kind = "google"
/// client_id = "..."
/// client_secret = "..."
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session lifetime and cardinality settings.
    pub session: SessionConfig,

    /// Cookie attributes for the session credential.
    pub cookie: CookieConfig,

    /// External identity-provider settings.
    pub provider: ProviderConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            cookie: CookieConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Session lifetime and cardinality configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed session time-to-live. No sliding expiration.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Session cardinality policy applied at login.
    pub policy: SessionPolicy,

    /// Interval between background sweeps of expired session rows.
    /// The sweep is storage hygiene only; expiry is enforced at resolve
    /// time regardless.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
            policy: SessionPolicy::Single,
            cleanup_interval: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Session cardinality policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPolicy {
    /// A new login invalidates all prior sessions for the user.
    Single,
    /// A user may hold multiple concurrent sessions.
    Multiple,
}

impl SessionPolicy {
    /// Returns `true` if prior sessions must be invalidated at login.
    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single)
    }
}

/// Cookie attributes for the session credential.
///
/// The session cookie is always `HttpOnly`. `SameSite=None` (the default)
/// requires `secure = true` to be accepted by browsers; validation
/// enforces this pairing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name carrying the session token.
    pub name: String,

    /// Set the `Secure` attribute (HTTPS only).
    pub secure: bool,

    /// `SameSite` attribute: "strict", "lax", or "none".
    pub same_site: String,

    /// Cookie path.
    pub path: String,

    /// Optional cookie domain.
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "session_token".to_string(),
            secure: true,
            same_site: "none".to_string(),
            path: "/".to_string(),
            domain: None,
        }
    }
}

impl CookieConfig {
    /// Builds a `Set-Cookie` header value carrying the session token.
    #[must_use]
    pub fn build_cookie(&self, token: &str, max_age_secs: u64) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}; HttpOnly",
            self.name, token, max_age_secs, self.path
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", same_site_value(&self.same_site)));
        if let Some(domain) = &self.domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        cookie
    }

    /// Builds a `Set-Cookie` header value that clears the session cookie.
    #[must_use]
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; Max-Age=0; Path={}; HttpOnly", self.name, self.path);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", same_site_value(&self.same_site)));
        if let Some(domain) = &self.domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        cookie
    }
}

/// Canonical capitalization for the SameSite attribute value.
fn same_site_value(raw: &str) -> &'static str {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "lax" => "Lax",
        _ => "None",
    }
}

/// External identity-provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Which verifier to use: "google" (authorization-code exchange) or
    /// "session-data" (hosted session-id introspection).
    pub kind: String,

    /// OAuth client id (google).
    pub client_id: String,

    /// OAuth client secret (google).
    pub client_secret: String,

    /// Token endpoint URL (google).
    pub token_url: String,

    /// UserInfo endpoint URL (google).
    pub userinfo_url: String,

    /// Session-data endpoint URL (session-data).
    pub session_data_url: String,

    /// Timeout applied to every call to the provider.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "google".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            session_data_url: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The session TTL or cleanup interval is zero
    /// - The cookie name is empty, or `SameSite=None` without `Secure`
    /// - The provider kind is unknown, or its required endpoints/credentials
    ///   are missing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session.ttl must be > 0".to_string(),
            ));
        }
        if self.session.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session.cleanup_interval must be > 0".to_string(),
            ));
        }

        if self.cookie.name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "cookie.name cannot be empty".to_string(),
            ));
        }
        match self.cookie.same_site.to_ascii_lowercase().as_str() {
            "strict" | "lax" => {}
            "none" => {
                // Browsers reject SameSite=None cookies without Secure.
                if !self.cookie.secure {
                    return Err(ConfigError::InvalidValue(
                        "cookie.same_site = \"none\" requires cookie.secure = true".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid cookie.same_site: '{other}'. Must be strict, lax, or none"
                )));
            }
        }

        match self.provider.kind.as_str() {
            "google" => {
                if self.provider.client_id.is_empty() {
                    return Err(ConfigError::Missing("provider.client_id".to_string()));
                }
                if self.provider.client_secret.is_empty() {
                    return Err(ConfigError::Missing("provider.client_secret".to_string()));
                }
            }
            "session-data" => {
                if self.provider.session_data_url.is_empty() {
                    return Err(ConfigError::Missing("provider.session_data_url".to_string()));
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid provider.kind: '{other}'. Must be google or session-data"
                )));
            }
        }

        if self.provider.timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "provider.timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.provider.client_id = "client".to_string();
        config.provider.client_secret = "secret".to_string();
        config
    }

    #[test]
    fn test_default_session_config() {
        let session = SessionConfig::default();
        assert_eq!(session.ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(session.policy, SessionPolicy::Single);
        assert!(session.policy.is_single());
    }

    #[test]
    fn test_valid_config_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_fails_validation() {
        let mut config = valid_config();
        config.session.ttl = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.ttl"));
    }

    #[test]
    fn test_samesite_none_requires_secure() {
        let mut config = valid_config();
        config.cookie.secure = false;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookie.secure"));

        config.cookie.same_site = "lax".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_samesite_fails_validation() {
        let mut config = valid_config();
        config.cookie.same_site = "sideways".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_google_provider_requires_credentials() {
        let mut config = AuthConfig::default();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Missing(_)
        ));

        config.provider.client_id = "client".to_string();
        config.provider.client_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_data_provider_requires_url() {
        let mut config = AuthConfig::default();
        config.provider.kind = "session-data".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Missing(_)
        ));

        config.provider.session_data_url = "https://auth.example.com/session-data".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_kind_fails_validation() {
        let mut config = valid_config();
        config.provider.kind = "facebook".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidValue(_)
        ));
    }

    #[test]
    fn test_build_cookie() {
        let config = CookieConfig::default();
        let cookie = config.build_cookie("tok123", 604_800);
        assert!(cookie.contains("session_token=tok123"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn test_clear_cookie() {
        let config = CookieConfig::default();
        let cookie = config.clear_cookie();
        assert!(cookie.starts_with("session_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_cookie_with_domain() {
        let config = CookieConfig {
            domain: Some("curalink.example.com".to_string()),
            ..CookieConfig::default()
        };
        let cookie = config.build_cookie("tok", 60);
        assert!(cookie.contains("Domain=curalink.example.com"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = valid_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AuthConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.session.ttl, parsed.session.ttl);
        assert_eq!(config.session.policy, parsed.session.policy);
        assert_eq!(config.cookie.name, parsed.cookie.name);
    }
}
