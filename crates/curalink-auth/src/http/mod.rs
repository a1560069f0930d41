//! HTTP endpoints for the authentication surface.
//!
//! Routes:
//! - `POST /auth/session` - exchange an identity assertion for a session
//! - `GET  /auth/me`      - return the authenticated user
//! - `POST /auth/logout`  - invalidate the presented session
//! - `POST /auth/role`    - one-time role assignment (onboarding)

pub mod logout;
pub mod me;
pub mod role;
pub mod session;

use axum::routing::{get, post};
use axum::Router;

use crate::middleware::AuthState;

/// Builds the authentication router.
pub fn router() -> Router<AuthState> {
    Router::new()
        .route("/auth/session", post(session::create_session))
        .route("/auth/me", get(me::current_user))
        .route("/auth/logout", post(logout::logout))
        .route("/auth/role", post(role::assign_role))
}
