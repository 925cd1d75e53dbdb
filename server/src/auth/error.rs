//! Authentication error taxonomy

use thiserror::Error;

use crate::data::DataError;

/// Outcome of a resolution that did not yield a user
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credential, header or session was presented. Valid anonymous state.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A credential was presented but could not be verified
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The directory service could not be reached or refused the service account
    #[error("Directory service unavailable: {0}")]
    DirectoryUnavailable(String),

    /// A concurrent first login won the race but its user could not be read back
    #[error("Could not provision user '{login}' after a concurrent creation")]
    ProvisioningConflict { login: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DataError),

    /// Session token could not be issued
    #[error("Session error: {0}")]
    Session(String),
}

impl AuthError {
    /// True for the anonymous (not an error) state
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "AUTH_REQUIRED",
            Self::AuthenticationFailed => "AUTH_FAILED",
            Self::DirectoryUnavailable(_) => "DIRECTORY_UNAVAILABLE",
            Self::ProvisioningConflict { .. } => "PROVISIONING_CONFLICT",
            Self::Persistence(_) | Self::Session(_) => "INTERNAL",
        }
    }

    /// Message safe to show to the end user
    ///
    /// Only `AuthenticationFailed` talks about credentials; service problems
    /// get their own wording so users do not retype a correct password.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Authentication required",
            Self::AuthenticationFailed => "Authentication failed",
            Self::DirectoryUnavailable(_) => {
                "The directory service is currently unavailable. Please try again later."
            }
            Self::ProvisioningConflict { .. } => {
                "Your account is being created by another request. Please try again."
            }
            Self::Persistence(_) | Self::Session(_) => "Internal server error",
        }
    }
}
