//! Session creation endpoint.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::identity::Assertion;
use crate::middleware::AuthState;
use crate::storage::User;

/// Response body for a successful login.
///
/// The token is returned in the body as well as the cookie so that
/// non-browser clients can present it as a bearer credential.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub session_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// `POST /auth/session`
///
/// Exchanges an identity assertion for an application session. On success
/// the response sets the session cookie and returns the user; on any
/// failure nothing is set and the error response carries no session.
pub async fn create_session(
    State(state): State<AuthState>,
    Json(assertion): Json<Assertion>,
) -> Result<Response, AuthError> {
    let issued = state.issuer.issue_session(&assertion).await?;

    let cookie = state
        .cookie_config
        .build_cookie(&issued.session.token, issued.session.remaining_secs());
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(header::SET_COOKIE, value);
    }

    let body = SessionResponse {
        user: issued.user,
        session_token: issued.session.token,
        expires_at: issued.session.expires_at,
    };

    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_session_response_shape() {
        let user = User::new("pat@example.com", "Pat");
        let response = SessionResponse {
            user,
            session_token: "tok".to_string(),
            expires_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["sessionToken"], "tok");
        assert!(json["user"]["email"].is_string());
        assert!(json["expiresAt"].is_string());
        let _ = Uuid::parse_str(json["user"]["id"].as_str().unwrap()).unwrap();
    }
}
