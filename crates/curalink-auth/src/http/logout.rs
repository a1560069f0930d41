//! Logout endpoint.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::AuthError;
use crate::middleware::auth::extract_session_token;
use crate::middleware::AuthState;

/// `POST /auth/logout`
///
/// Invalidates the presented session and clears the cookie. Idempotent:
/// a request without a token, or with one that is already gone, still
/// succeeds and still clears the cookie.
pub async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    if let Some(token) = extract_session_token(&headers, &state.cookie_config) {
        state.resolver.invalidate(&token).await?;
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&state.cookie_config.clear_cookie()) {
        response_headers.insert(header::SET_COOKIE, value);
    }

    Ok((
        StatusCode::OK,
        response_headers,
        Json(json!({"status": "logged_out"})),
    )
        .into_response())
}
