//! Credential lifecycle: `TEMPORARY` at creation, `PERMANENT` after the
//! first forced change or reset-token redemption. Never back.

use std::sync::Arc;

use chrono::Utc;
use eduid_core::attributes::{AttributePatch, FieldPatch, first_value, keys};
use eduid_core::error::{EduIdError, EduIdResult};
use eduid_core::gateway::IdentityGateway;
use eduid_core::models::profile::{PasswordStatus, UserProfile};
use eduid_core::projection::{AttributeProjector, ProfilePatch};
use tracing::{debug, error, info, warn};

use crate::error::LifecycleError;
use crate::notify::{self, NotificationDispatcher};
use crate::token;
use crate::upstream::{IDENTITY_PROVIDER, UpstreamGuard};

pub struct PasswordLifecycleManager<G: IdentityGateway> {
    gateway: Arc<G>,
    guard: Arc<UpstreamGuard>,
    notifier: NotificationDispatcher,
    min_password_length: usize,
}

impl<G: IdentityGateway> PasswordLifecycleManager<G> {
    pub fn new(
        gateway: Arc<G>,
        guard: Arc<UpstreamGuard>,
        notifier: NotificationDispatcher,
        min_password_length: usize,
    ) -> Self {
        Self {
            gateway,
            guard,
            notifier,
            min_password_length,
        }
    }

    /// Set the document number as a temporary credential.
    ///
    /// Refused once the credential has become permanent.
    pub async fn initialize(&self, id: &str, document_number: &str) -> EduIdResult<()> {
        let current = self.fetch(id).await?;
        if current.password_status == Some(PasswordStatus::Permanent) {
            return Err(LifecycleError::AlreadyPermanent.into());
        }

        let gateway = &self.gateway;
        self.guard
            .call(
                IDENTITY_PROVIDER,
                "set_credential",
                gateway.set_credential(id, document_number, false),
            )
            .await?;

        let now = Utc::now();
        self.patch(
            id,
            ProfilePatch {
                password_status: FieldPatch::Set(PasswordStatus::Temporary),
                password_created_at: FieldPatch::Set(now),
                updated_at: FieldPatch::Set(now),
                ..Default::default()
            },
        )
        .await?;

        info!(user_id = %id, "Temporary credential initialized");
        Ok(())
    }

    /// Issue a fresh reset token, replacing any earlier one.
    ///
    /// Returns the raw token; only its digest is stored.
    pub async fn issue_reset_token(&self, id: &str) -> EduIdResult<String> {
        let raw = token::generate_reset_token();
        self.patch(
            id,
            ProfilePatch {
                reset_token: FieldPatch::Set(token::hash_reset_token(&raw)),
                updated_at: FieldPatch::Set(Utc::now()),
                ..Default::default()
            },
        )
        .await?;

        debug!(user_id = %id, "Reset token issued");
        Ok(raw)
    }

    /// Redeem a reset token and make `new_password` the permanent
    /// credential.
    ///
    /// The token is consumed with a conditional clear; of two
    /// concurrent redemptions only one succeeds.
    pub async fn redeem_reset_token(&self, raw_token: &str, new_password: &str) -> EduIdResult<UserProfile> {
        if raw_token.trim().is_empty() {
            return Err(LifecycleError::TokenInvalidOrExpired.into());
        }
        self.check_policy(new_password, None)?;

        let digest = token::hash_reset_token(raw_token);
        let gateway = &self.gateway;
        // TODO: linear scan over every identity; replace with a
        // token-digest index once the provider exposes attribute search.
        let records = self
            .guard
            .read(IDENTITY_PROVIDER, "list_all", move || gateway.list_all())
            .await?;

        let Some(owner) = records.into_iter().find(|r| {
            first_value(&r.attributes, keys::PASSWORD_RESET_TOKEN) == Some(digest.as_str())
        }) else {
            debug!("Reset token matched no identity");
            return Err(LifecycleError::TokenInvalidOrExpired.into());
        };

        let consumed = self
            .guard
            .call(
                IDENTITY_PROVIDER,
                "compare_and_clear_attribute",
                gateway.compare_and_clear_attribute(&owner.id, keys::PASSWORD_RESET_TOKEN, &digest),
            )
            .await?;
        if !consumed {
            debug!(user_id = %owner.id, "Reset token consumed concurrently");
            return Err(LifecycleError::TokenInvalidOrExpired.into());
        }

        if let Err(e) = self.store_permanent(&owner.id, new_password).await {
            self.restore_reset_token(&owner.id, &digest).await;
            return Err(e);
        }
        self.confirm_permanent(&owner.id).await
    }

    /// Replace the temporary credential after proving knowledge of it.
    pub async fn force_change(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
    ) -> EduIdResult<UserProfile> {
        let profile = self.fetch(id).await?;
        match profile.password_status {
            Some(PasswordStatus::Temporary) => {}
            Some(PasswordStatus::Permanent) => {
                return Err(LifecycleError::AlreadyPermanent.into());
            }
            None => return Err(LifecycleError::UnknownState(id.to_string()).into()),
        }

        let gateway = &self.gateway;
        let valid = self
            .guard
            .read(IDENTITY_PROVIDER, "verify_credential", move || {
                gateway.verify_credential(id, current_password)
            })
            .await?;
        if !valid {
            warn!(user_id = %id, "Forced password change with wrong current password");
            return Err(LifecycleError::InvalidCredentials.into());
        }
        self.check_policy(new_password, Some(current_password))?;

        self.make_permanent(id, new_password).await
    }

    /// `false` for unknown identities.
    pub async fn is_temporary(&self, id: &str) -> EduIdResult<bool> {
        match self.fetch(id).await {
            Ok(profile) => Ok(profile.password_status == Some(PasswordStatus::Temporary)),
            Err(EduIdError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn make_permanent(&self, id: &str, new_password: &str) -> EduIdResult<UserProfile> {
        self.store_permanent(id, new_password).await?;
        self.confirm_permanent(id).await
    }

    /// Write the new credential and flip the state to `PERMANENT`.
    async fn store_permanent(&self, id: &str, new_password: &str) -> EduIdResult<()> {
        let gateway = &self.gateway;
        self.guard
            .call(
                IDENTITY_PROVIDER,
                "set_credential",
                gateway.set_credential(id, new_password, false),
            )
            .await?;

        let now = Utc::now();
        self.patch(
            id,
            ProfilePatch {
                password_status: FieldPatch::Set(PasswordStatus::Permanent),
                password_created_at: FieldPatch::Set(now),
                reset_token: FieldPatch::Clear,
                updated_at: FieldPatch::Set(now),
                ..Default::default()
            },
        )
        .await
    }

    async fn confirm_permanent(&self, id: &str) -> EduIdResult<UserProfile> {
        let profile = self.fetch(id).await?;
        info!(user_id = %id, "Credential is now permanent");
        if let Some(n) = notify::password_changed(&profile) {
            self.notifier.dispatch(n);
        }
        Ok(profile)
    }

    /// Put a consumed token back after the credential write failed, so
    /// the owner can retry with the same link. Skipped when a newer
    /// token has been issued meanwhile.
    async fn restore_reset_token(&self, id: &str, digest: &str) {
        let gateway = &self.gateway;
        let current = match self
            .guard
            .read(IDENTITY_PROVIDER, "get", move || gateway.get(id))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(user_id = %id, error = %e, "Reset token lost, identity unreadable");
                return;
            }
        };
        if first_value(&current.attributes, keys::PASSWORD_RESET_TOKEN).is_some() {
            debug!(user_id = %id, "Newer reset token present, not restoring");
            return;
        }

        let mut patch = AttributePatch::new();
        patch.set(keys::PASSWORD_RESET_TOKEN, digest);
        match self
            .guard
            .call(
                IDENTITY_PROVIDER,
                "patch_attributes",
                gateway.patch_attributes(id, &patch),
            )
            .await
        {
            Ok(()) => warn!(user_id = %id, "Credential update failed, reset token restored"),
            Err(e) => error!(user_id = %id, error = %e, "Restoring reset token failed"),
        }
    }

    fn check_policy(&self, new_password: &str, current: Option<&str>) -> Result<(), LifecycleError> {
        if new_password.chars().count() < self.min_password_length {
            return Err(LifecycleError::PasswordTooShort {
                min: self.min_password_length,
            });
        }
        if current == Some(new_password) {
            return Err(LifecycleError::PasswordUnchanged);
        }
        Ok(())
    }

    async fn patch(&self, id: &str, patch: ProfilePatch) -> EduIdResult<()> {
        let attributes = AttributeProjector::project_patch(&patch);
        let gateway = &self.gateway;
        self.guard
            .call(
                IDENTITY_PROVIDER,
                "patch_attributes",
                gateway.patch_attributes(id, &attributes),
            )
            .await
    }

    async fn fetch(&self, id: &str) -> EduIdResult<UserProfile> {
        let gateway = &self.gateway;
        let record = self
            .guard
            .read(IDENTITY_PROVIDER, "get", move || gateway.get(id))
            .await?;
        Ok(AttributeProjector::from_representation(&record))
    }
}
