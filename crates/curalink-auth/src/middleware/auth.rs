//! Session authentication extractors.
//!
//! Axum extractors that resolve the session credential carried by a
//! request (cookie or bearer header) to the authenticated [`User`].
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use curalink_auth::middleware::{AuthState, SessionAuth};
//!
//! async fn protected_handler(SessionAuth(user): SessionAuth) -> String {
//!     format!("Hello, {}!", user.display_name)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, header::COOKIE, request::Parts},
};

use crate::config::CookieConfig;
use crate::error::AuthError;
use crate::issuer::SessionIssuer;
use crate::resolver::SessionResolver;
use crate::storage::User;

// =============================================================================
// Auth State
// =============================================================================

/// State required for session authentication.
///
/// Include this in your application state and make it available to the
/// extractors via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Issues sessions from identity assertions (login).
    pub issuer: Arc<SessionIssuer>,

    /// Resolves presented tokens to users.
    pub resolver: Arc<SessionResolver>,

    /// Cookie configuration for browser-based auth.
    pub cookie_config: CookieConfig,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(issuer: Arc<SessionIssuer>, resolver: Arc<SessionResolver>) -> Self {
        Self {
            issuer,
            resolver,
            cookie_config: CookieConfig::default(),
        }
    }

    /// Sets cookie configuration for browser-based authentication.
    #[must_use]
    pub fn with_cookie_config(mut self, cookie_config: CookieConfig) -> Self {
        self.cookie_config = cookie_config;
        self
    }
}

// =============================================================================
// Session Auth Extractor
// =============================================================================

/// Axum extractor that requires an authenticated session.
///
/// The credential is read from the session cookie first, then from the
/// `Authorization: Bearer <token>` header. Both carry the same opaque
/// token. Rejections are generic: the client cannot tell a missing token
/// from an unknown or expired one.
pub struct SessionAuth(pub User);

impl<S> FromRequestParts<S> for SessionAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let Some(token) = extract_session_token(&parts.headers, &auth_state.cookie_config)
        else {
            return Err(AuthError::unauthorized("no session credential presented"));
        };

        let user = auth_state.resolver.authenticate(&token).await?;
        tracing::debug!(user_id = %user.id, "session authenticated");
        Ok(SessionAuth(user))
    }
}

// =============================================================================
// Optional Session Auth Extractor
// =============================================================================

/// Axum extractor that optionally resolves a session.
///
/// Unlike [`SessionAuth`], a request without any credential yields
/// `None` instead of a rejection. A credential that is present but
/// invalid still rejects, so callers never see a half-authenticated
/// request.
pub struct OptionalSessionAuth(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalSessionAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let Some(token) = extract_session_token(&parts.headers, &auth_state.cookie_config)
        else {
            return Ok(OptionalSessionAuth(None));
        };

        let user = auth_state.resolver.authenticate(&token).await?;
        Ok(OptionalSessionAuth(Some(user)))
    }
}

// =============================================================================
// Token Extraction
// =============================================================================

/// Extracts the session token from request headers: cookie first, bearer
/// second.
pub(crate) fn extract_session_token(
    headers: &HeaderMap,
    cookie_config: &CookieConfig,
) -> Option<String> {
    if let Some(token) = extract_token_from_cookie(headers, cookie_config) {
        return Some(token);
    }
    extract_token_from_bearer(headers)
}

fn extract_token_from_cookie(headers: &HeaderMap, cookie_config: &CookieConfig) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;

    // Parse cookies (simple key=value; key=value format)
    let cookie_name = &cookie_config.name;
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name.trim() == cookie_name
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

fn extract_token_from_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}

// =============================================================================
// Tests
// =============================================================================
