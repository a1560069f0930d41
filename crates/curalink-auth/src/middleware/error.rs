//! Error response handling.
//!
//! Implements `IntoResponse` for `AuthError`. Every authentication denial
//! produces the same status, headers, and body regardless of its internal
//! cause; the distinctions exist only in server logs.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// The one body every 401 carries. Unknown token, expired session, and
/// failed verification are indistinguishable to the client.
const GENERIC_DENIAL: &str = "Invalid or expired session";

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = error_details(&self);

        if self.is_server_error() {
            tracing::error!(category = %self.category(), error = %self, "request failed");
        } else {
            tracing::debug!(category = %self.category(), error = %self, "request rejected");
        }

        let body = json!({
            "error": error_code,
            "message": message,
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(error_code);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Maps an `AuthError` to its HTTP surface.
///
/// Returns (HTTP status, machine-readable code, client-facing message).
/// Authentication failures all collapse to the same tuple. Server errors
/// never carry their internal detail to the client.
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::IdentityVerification { .. }
        | AuthError::Unauthorized { .. }
        | AuthError::SessionExpired => (
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            GENERIC_DENIAL.to_string(),
        ),
        AuthError::Forbidden { message } => {
            (StatusCode::FORBIDDEN, "forbidden", message.clone())
        }
        AuthError::InvalidRequest { message } => {
            (StatusCode::BAD_REQUEST, "invalid_request", message.clone())
        }
        AuthError::Conflict { message } => (StatusCode::CONFLICT, "conflict", message.clone()),
        AuthError::Unavailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "Service temporarily unavailable".to_string(),
        ),
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            )
        }
    }
}

fn build_www_authenticate_header(error: &str) -> String {
    format!("Bearer realm=\"curalink\", error=\"{error}\"")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_authentication_failures_look_identical() {
        let causes = [
            AuthError::unauthorized("unknown session token"),
            AuthError::SessionExpired,
            AuthError::identity_verification("google", "token exchange failed with status 400"),
        ];

        let details: Vec<_> = causes.iter().map(error_details).collect();
        for detail in &details {
            assert_eq!(detail.0, StatusCode::UNAUTHORIZED);
            assert_eq!(detail.1, "unauthorized");
            assert_eq!(detail.2, GENERIC_DENIAL);
        }
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let (status, _, message) =
            error_details(&AuthError::storage("connection refused to db.internal:5432"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("db.internal"));
    }

    #[test]
    fn test_unavailable_maps_to_503() {
        let (status, code, _) = error_details(&AuthError::unavailable("provider timeout"));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "unavailable");
    }

    #[test]
    fn test_invalid_request_keeps_message() {
        let (status, _, message) = error_details(&AuthError::invalid_request("missing field"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "missing field");
    }

    #[test]
    fn test_www_authenticate_header_format() {
        let header = build_www_authenticate_header("unauthorized");
        assert_eq!(header, "Bearer realm=\"curalink\", error=\"unauthorized\"");
    }
}
