//! Axum integration: extractors and error responses.

pub mod auth;
pub mod error;

pub use auth::{AuthState, OptionalSessionAuth, SessionAuth};
