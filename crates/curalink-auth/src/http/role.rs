//! One-time role assignment endpoint.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AuthError;
use crate::middleware::{AuthState, SessionAuth};
use crate::storage::User;
use crate::AuthResult;

/// Roles a user may claim during onboarding.
const ALLOWED_ROLES: &[&str] = &["patient", "researcher"];

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

/// `POST /auth/role`
///
/// Assigns the user's role exactly once. A second assignment is rejected
/// even if it names the same role; the choice is permanent.
pub async fn assign_role(
    State(state): State<AuthState>,
    SessionAuth(user): SessionAuth,
    Json(request): Json<AssignRoleRequest>,
) -> AuthResult<Json<User>> {
    let role = request.role.trim().to_lowercase();
    if !ALLOWED_ROLES.contains(&role.as_str()) {
        return Err(AuthError::invalid_request(format!(
            "unknown role '{role}', expected one of: {}",
            ALLOWED_ROLES.join(", ")
        )));
    }

    if user.has_any_role() {
        return Err(AuthError::conflict("role already assigned"));
    }

    // The store's conditional write is the arbiter; the check above only
    // short-circuits the common case.
    let users = state.resolver.user_store();
    users.assign_roles(user.id, &[role.clone()]).await?;

    let mut updated = user;
    updated.roles = vec![role];
    tracing::info!(user_id = %updated.id, "role assigned");
    Ok(Json(updated))
}
