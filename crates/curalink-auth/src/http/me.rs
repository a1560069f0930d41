//! Current-user endpoint.

use axum::Json;

use crate::middleware::SessionAuth;
use crate::storage::User;

/// `GET /auth/me`
///
/// Returns the user behind the presented session. Rejections come from
/// the extractor and are uniform across all failure causes.
pub async fn current_user(SessionAuth(user): SessionAuth) -> Json<User> {
    Json(user)
}
