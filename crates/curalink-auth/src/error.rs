//! Authentication error types.
//!
//! This module defines all error types that can occur during identity
//! verification and session handling.

use std::fmt;

/// Errors that can occur during authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The external identity assertion was rejected or could not be verified.
    ///
    /// Covers provider HTTP errors, malformed provider payloads, and
    /// unverified email addresses. Never proceeds to user or session
    /// creation.
    #[error("Identity verification failed: {provider} - {message}")]
    IdentityVerification {
        /// The identity provider name.
        provider: String,
        /// Description of the failure (internal; not sent to clients).
        message: String,
    },

    /// The request lacks valid authentication credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The presented session token has passed its expiry.
    #[error("Session expired")]
    SessionExpired,

    /// The authenticated user is not allowed to perform the action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The request is malformed or carries invalid values.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// A uniqueness constraint was violated, typically by a concurrent
    /// write racing on the same key.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflicting write.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An external collaborator (identity provider or store) was
    /// unreachable or timed out. Retryable; distinct from an
    /// authentication failure.
    #[error("Service unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `IdentityVerification` error.
    #[must_use]
    pub fn identity_verification(
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::IdentityVerification {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::IdentityVerification { .. }
                | Self::Unauthorized { .. }
                | Self::SessionExpired
                | Self::Forbidden { .. }
                | Self::InvalidRequest { .. }
                | Self::Conflict { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Unavailable { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this error denies authentication (maps to 401).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::IdentityVerification { .. } | Self::Unauthorized { .. } | Self::SessionExpired
        )
    }

    /// Returns `true` if the caller may retry the operation.
    ///
    /// Infrastructure outages are retryable; credential failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Unavailable { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IdentityVerification { .. } => ErrorCategory::Verification,
            Self::Unauthorized { .. } => ErrorCategory::Session,
            Self::SessionExpired => ErrorCategory::Session,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Conflict { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Unavailable { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity-provider verification errors.
    Verification,
    /// Session resolution errors (missing, invalid, expired tokens).
    Session,
    /// Authorization errors (permission checks).
    Authorization,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verification => write!(f, "verification"),
            Self::Session => write!(f, "session"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
