//! eduid auth: role hierarchy validation, the password lifecycle,
//! reset tokens, notification dispatch, and the identity orchestrator
//! composing them over the gateway contracts.

pub mod config;
pub mod error;
pub mod notify;
pub mod password;
pub mod roles;
pub mod service;
pub mod token;
pub mod upstream;

pub use config::IdentityConfig;
pub use error::LifecycleError;
pub use roles::{CallerContext, RoleHierarchyValidator, ValidatedRoleAssignment};
pub use service::{CreateIdentityInput, DirectorWithStaff, IdentityOrchestrator, UpdateIdentityInput};
