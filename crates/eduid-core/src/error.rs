//! Error types for the identity core.

use thiserror::Error;

use crate::models::role::{Role, RoleTier};

/// Rejections produced before any write reaches the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("role {role} is not assignable through the {tier} entry point")]
    ForeignRole { role: Role, tier: RoleTier },

    #[error("roles {0:?} cannot be held together")]
    IncompatibleRoles(Vec<Role>),

    #[error("the director role requires an institution id")]
    MissingInstitution,

    #[error("institution {institution_id} does not exist")]
    InstitutionNotFound { institution_id: String },

    #[error("institution {institution_id} ({name}) is not active")]
    InstitutionInactive {
        institution_id: String,
        name: String,
    },

    #[error("institution {institution_id} was rejected: {reason}")]
    InstitutionRejected {
        institution_id: String,
        reason: String,
    },

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum EduIdError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Reset token is invalid or expired")]
    TokenInvalidOrExpired,

    #[error("Password has already been changed")]
    PasswordAlreadyPermanent,

    #[error("Password state of identity {id} is unknown")]
    PasswordStateUnknown { id: String },

    #[error("Upstream {service} failed: {reason}")]
    Upstream { service: String, reason: String },

    #[error("Upstream {service} timed out during {operation}")]
    Timeout {
        service: String,
        operation: String,
    },

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EduIdError {
    /// Whether a failed idempotent read may be attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Timeout { .. })
    }
}

pub type EduIdResult<T> = Result<T, EduIdError>;

/// Failure to hand a message to the mail transport.
///
/// Deliberately has no conversion into [`EduIdError`]: notification
/// failures are logged at the dispatch boundary and dropped.
#[derive(Debug, Error)]
#[error("notification {kind} to {recipient} failed: {reason}")]
pub struct NotificationError {
    pub kind: String,
    pub recipient: String,
    pub reason: String,
}
