//! Session issuance.
//!
//! Orders the login pipeline: verify the assertion, resolve the user,
//! apply the session policy, and only then mint the application session.
//! Minting is the last step so that no failure anywhere in the pipeline
//! can leave the caller holding a live credential.

use std::sync::Arc;

use crate::config::{SessionConfig, SessionPolicy};
use crate::directory::UserDirectory;
use crate::identity::{Assertion, IdentityVerifier};
use crate::session::Session;
use crate::storage::{SessionStore, User};
use crate::AuthResult;

/// A freshly issued session together with the user it authenticates.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The authenticated user.
    pub user: User,
    /// The minted session, including the token handed to the client.
    pub session: Session,
}

/// Issues application sessions from identity assertions.
pub struct SessionIssuer {
    verifier: Arc<dyn IdentityVerifier>,
    directory: UserDirectory,
    sessions: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionIssuer {
    /// Wires an issuer from its collaborators.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        directory: UserDirectory,
        sessions: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            verifier,
            directory,
            sessions,
            config,
        }
    }

    /// Runs the full login pipeline for an assertion.
    ///
    /// Steps run strictly in order and each propagates failure before the
    /// next begins: verification, user resolution, policy enforcement,
    /// minting. A verification failure therefore can never produce a
    /// session, and a minting failure never leaves a half-authenticated
    /// user visible.
    ///
    /// # Errors
    ///
    /// Propagates verification, directory, and storage errors unchanged.
    pub async fn issue_session(&self, assertion: &Assertion) -> AuthResult<IssuedSession> {
        let identity = self.verifier.verify(assertion).await?;
        let user = self.directory.resolve_or_create(&identity).await?;

        if self.config.policy == SessionPolicy::Single {
            let removed = self.sessions.delete_for_user(user.id).await?;
            if removed > 0 {
                tracing::debug!(user_id = %user.id, removed, "superseded existing sessions");
            }
        }

        let session = Session::new(user.id, self.config.ttl);
        self.sessions.create(&session).await?;

        tracing::info!(user_id = %user.id, expires_at = %session.expires_at, "session issued");
        Ok(IssuedSession { user, session })
    }
}
