//! Credential lifecycle error types.

use eduid_core::error::{EduIdError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("new password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("new password must differ from the current one")]
    PasswordUnchanged,

    #[error("reset token is invalid or expired")]
    TokenInvalidOrExpired,

    #[error("password has already been changed")]
    AlreadyPermanent,

    #[error("password state of identity {0} is unknown")]
    UnknownState(String),
}

impl From<LifecycleError> for EduIdError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidCredentials => EduIdError::AuthenticationFailed {
                reason: err.to_string(),
            },
            LifecycleError::PasswordTooShort { .. } | LifecycleError::PasswordUnchanged => {
                EduIdError::Validation(ValidationError::InvalidField {
                    field: "new_password",
                    reason: err.to_string(),
                })
            }
            LifecycleError::TokenInvalidOrExpired => EduIdError::TokenInvalidOrExpired,
            LifecycleError::AlreadyPermanent => EduIdError::PasswordAlreadyPermanent,
            LifecycleError::UnknownState(id) => EduIdError::PasswordStateUnknown { id },
        }
    }
}
