//! Wiring of the auth components from configuration.
//!
//! Chooses the storage backend and identity verifier, builds the
//! directory/issuer/resolver pipeline, and starts the expired-session
//! sweep.

use std::sync::Arc;

use curalink_auth::{
    AuthState, GoogleVerifier, IdentityVerifier, MemoryAuthStorage, SessionDataVerifier,
    SessionIssuer, SessionResolver, SessionStore, UserDirectory, UserStore,
};
use curalink_auth_postgres::PostgresAuthStorage;

use crate::config::AppConfig;

/// Builds the [`AuthState`] the routers run on.
///
/// # Errors
///
/// Returns an error if the database connection, schema setup, or verifier
/// construction fails.
pub async fn build_auth_state(cfg: &AppConfig) -> anyhow::Result<AuthState> {
    let (users, sessions): (Arc<dyn UserStore>, Arc<dyn SessionStore>) =
        match cfg.storage.postgres {
            Some(ref pg) => {
                let storage = PostgresAuthStorage::connect(&pg.connection_url()).await?;
                storage.ensure_schema().await?;
                tracing::info!(host = %pg.host, database = %pg.database, "postgres storage ready");
                let storage = Arc::new(storage);
                (storage.clone() as _, storage as _)
            }
            None => {
                tracing::warn!("no postgres configured, using in-memory storage");
                let storage = Arc::new(MemoryAuthStorage::new());
                (storage.clone() as _, storage as _)
            }
        };

    let verifier: Arc<dyn IdentityVerifier> = match cfg.auth.provider.kind.as_str() {
        "session-data" => Arc::new(SessionDataVerifier::new(cfg.auth.provider.clone())?),
        _ => Arc::new(GoogleVerifier::new(cfg.auth.provider.clone())?),
    };
    tracing::info!(provider = %cfg.auth.provider.kind, "identity verifier ready");

    let directory = UserDirectory::new(users.clone());
    let issuer = Arc::new(SessionIssuer::new(
        verifier,
        directory,
        sessions.clone(),
        cfg.auth.session.clone(),
    ));
    let resolver = Arc::new(SessionResolver::new(users, sessions.clone()));

    spawn_session_sweep(sessions, cfg.auth.session.cleanup_interval);

    Ok(AuthState::new(issuer, resolver).with_cookie_config(cfg.auth.cookie.clone()))
}

/// Periodically deletes expired session rows. Storage hygiene only;
/// expiry is enforced at resolve time whether or not this ever runs.
fn spawn_session_sweep(sessions: Arc<dyn SessionStore>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sessions.delete_expired().await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "swept expired sessions"),
                Err(e) => tracing::warn!("session sweep failed: {}", e),
            }
        }
    });
}
