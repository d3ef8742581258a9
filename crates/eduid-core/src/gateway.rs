//! Contracts of the external collaborators the core depends on.
//!
//! All operations are async. Implementations live in adapter crates;
//! the core never holds state of its own between calls.

use crate::attributes::AttributePatch;
use crate::error::{EduIdResult, NotificationError};
use crate::models::identity::{IdentityChanges, IdentityRecord, NewIdentity};
use crate::models::institution::InstitutionStatus;
use crate::models::notification::Notification;

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

pub trait IdentityGateway: Send + Sync {
    /// Create an identity and return its provider id.
    ///
    /// Fails with `AlreadyExists` when the username or email is taken.
    fn create(&self, input: NewIdentity) -> impl Future<Output = EduIdResult<String>> + Send;
    fn get(&self, id: &str) -> impl Future<Output = EduIdResult<IdentityRecord>> + Send;
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = EduIdResult<IdentityRecord>> + Send;
    fn get_by_email(&self, email: &str)
    -> impl Future<Output = EduIdResult<IdentityRecord>> + Send;
    fn list_all(&self) -> impl Future<Output = EduIdResult<Vec<IdentityRecord>>> + Send;
    fn update_names(
        &self,
        id: &str,
        changes: IdentityChanges,
    ) -> impl Future<Output = EduIdResult<()>> + Send;
    fn set_enabled(&self, id: &str, enabled: bool)
    -> impl Future<Output = EduIdResult<()>> + Send;
    /// Replace the stored credential.
    fn set_credential(
        &self,
        id: &str,
        value: &str,
        temporary: bool,
    ) -> impl Future<Output = EduIdResult<()>> + Send;
    /// Check a credential claim. `Ok(false)` on mismatch.
    fn verify_credential(
        &self,
        id: &str,
        claim: &str,
    ) -> impl Future<Output = EduIdResult<bool>> + Send;
    /// Remove every realm role of the identity, then assign `roles`.
    fn replace_realm_roles(
        &self,
        id: &str,
        roles: &[String],
    ) -> impl Future<Output = EduIdResult<()>> + Send;
    /// Merge `patch` into the stored attribute bag.
    fn patch_attributes(
        &self,
        id: &str,
        patch: &AttributePatch,
    ) -> impl Future<Output = EduIdResult<()>> + Send;
    /// Remove `key` only if its first value equals `expected`.
    ///
    /// Returns whether the key was removed. Must be atomic with respect
    /// to other writers of the same identity.
    fn compare_and_clear_attribute(
        &self,
        id: &str,
        key: &str,
        expected: &str,
    ) -> impl Future<Output = EduIdResult<bool>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = EduIdResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Institution service
// ---------------------------------------------------------------------------

pub trait InstitutionValidator: Send + Sync {
    fn validate(
        &self,
        institution_id: &str,
    ) -> impl Future<Output = EduIdResult<InstitutionStatus>> + Send;
}

// ---------------------------------------------------------------------------
// Mail delivery
// ---------------------------------------------------------------------------

pub trait NotificationGateway: Send + Sync + 'static {
    fn send(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
