//! # curalink-auth
//!
//! Session authentication and identity resolution for the CuraLink server.
//!
//! This crate provides:
//! - Identity verification against external providers
//! - A user directory keyed by verified email
//! - Opaque session tokens with server-side state and fixed TTL
//! - Axum extractors and HTTP endpoints for the auth surface
//!
//! ## Overview
//!
//! Authentication is delegated to an external identity provider; this
//! crate owns everything after verification: resolving the verified
//! identity to a canonical user, minting the application session, and
//! resolving presented tokens back to users. Sessions are opaque random
//! tokens looked up server-side, never self-describing credentials.
//!
//! ## Modules
//!
//! - [`config`] - Session, cookie, and provider configuration
//! - [`identity`] - Assertion verification against external providers
//! - [`directory`] - Verified identity to canonical user resolution
//! - [`session`] - Session record and token minting
//! - [`issuer`] - The ordered login pipeline
//! - [`resolver`] - Token to user resolution with lazy expiry
//! - [`middleware`] - Axum extractors and error responses
//! - [`storage`] - Storage traits plus the in-memory backend
//! - [`http`] - Axum handlers for the auth endpoints

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod identity;
pub mod issuer;
pub mod middleware;
pub mod resolver;
pub mod session;
pub mod storage;

pub use config::{AuthConfig, ConfigError, CookieConfig, ProviderConfig, SessionConfig, SessionPolicy};
pub use directory::UserDirectory;
pub use error::{AuthError, ErrorCategory};
pub use http::router;
pub use identity::{
    Assertion, GoogleVerifier, IdentityVerifier, SessionDataVerifier, VerifiedIdentity,
};
pub use issuer::{IssuedSession, SessionIssuer};
pub use middleware::{AuthState, OptionalSessionAuth, SessionAuth};
pub use resolver::SessionResolver;
pub use session::Session;
pub use storage::{normalize_email, MemoryAuthStorage, SessionStore, User, UserBuilder, UserStore};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
