//! Adapter-specific error types and conversions.

use eduid_core::error::EduIdError;

/// Gateway-adapter error type.
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Identity with this {field} already exists")]
    Duplicate { field: &'static str },

    #[error("Realm role {0} is not defined")]
    UnknownRealmRole(String),

    #[error("Credential hashing failed: {0}")]
    Hashing(String),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("HTTP call to {service} failed: {reason}")]
    Http { service: String, reason: String },

    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl From<IdpError> for EduIdError {
    fn from(err: IdpError) -> Self {
        match err {
            IdpError::NotFound { entity, id } => EduIdError::NotFound { entity, id },
            IdpError::Duplicate { field } => EduIdError::AlreadyExists {
                entity: format!("identity with this {field}"),
            },
            IdpError::UnknownRealmRole(role) => EduIdError::NotFound {
                entity: "realm role".into(),
                id: role,
            },
            IdpError::Hashing(msg) => EduIdError::Crypto(msg),
            IdpError::Http { service, reason } => EduIdError::Upstream { service, reason },
            other => EduIdError::Internal(other.to_string()),
        }
    }
}
