//! Identity orchestration: the only entry point callers use.
//!
//! Each operation is a short sequential pipeline: caller check, role
//! validation, projection, provider writes, lifecycle transition and,
//! last, a fire-and-forget notification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use eduid_core::attributes::{AttributeBag, FieldPatch};
use eduid_core::error::{EduIdError, EduIdResult, ValidationError};
use eduid_core::gateway::{IdentityGateway, InstitutionValidator, NotificationGateway};
use eduid_core::models::identity::{IdentityChanges, NewIdentity};
use eduid_core::models::profile::{DocumentType, PasswordStatus, UserInfo, UserProfile, UserStatus};
use eduid_core::models::role::{Role, RoleTier};
use eduid_core::projection::{AttributeProjector, ProfilePatch};
use tracing::{error, info, warn};

use crate::config::IdentityConfig;
use crate::notify::{self, NotificationDispatcher, NotificationWorker};
use crate::password::PasswordLifecycleManager;
use crate::roles::{CallerContext, RoleHierarchyValidator, ValidatedRoleAssignment};
use crate::token;
use crate::upstream::{IDENTITY_PROVIDER, UpstreamGuard};

/// Input for creating an identity.
///
/// `document_number` doubles as the temporary password.
#[derive(Debug, Clone, Default)]
pub struct CreateIdentityInput {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    /// Only read for directors created through the leadership entry
    /// point.
    pub institution_id: Option<String>,
    /// Defaults to active.
    pub status: Option<UserStatus>,
}

/// Partial update. `None` and blank strings leave the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateIdentityInput {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub roles: Option<Vec<String>>,
    pub institution_id: Option<String>,
    pub status: Option<UserStatus>,
}

/// A director together with the staff of their institution.
#[derive(Debug, Clone)]
pub struct DirectorWithStaff {
    pub director: UserProfile,
    pub staff: Vec<UserProfile>,
}

/// Which identities a caller may see through the generic operations.
enum Scope<'a> {
    All,
    Institution(&'a str),
}

impl Scope<'_> {
    fn of(caller: &CallerContext) -> EduIdResult<Scope<'_>> {
        if caller.is_admin() {
            Ok(Scope::All)
        } else {
            caller.require_director().map(Scope::Institution)
        }
    }

    fn covers(&self, profile: &UserProfile) -> bool {
        match self {
            Scope::All => true,
            Scope::Institution(institution) => {
                profile.is_staff() && profile.institution_id.as_deref() == Some(*institution)
            }
        }
    }
}

pub struct IdentityOrchestrator<G: IdentityGateway, I: InstitutionValidator> {
    gateway: Arc<G>,
    guard: Arc<UpstreamGuard>,
    roles: RoleHierarchyValidator<I>,
    lifecycle: PasswordLifecycleManager<G>,
    notifier: NotificationDispatcher,
    worker: NotificationWorker,
}

impl<G: IdentityGateway, I: InstitutionValidator> IdentityOrchestrator<G, I> {
    /// Wire the orchestrator and start the notification worker on the
    /// current runtime.
    pub fn new<N: NotificationGateway>(
        gateway: G,
        institutions: I,
        notifications: N,
        config: IdentityConfig,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let guard = Arc::new(UpstreamGuard::from_config(&config));
        let (notifier, worker) = NotificationDispatcher::start(notifications, &config);

        Self {
            roles: RoleHierarchyValidator::new(Arc::new(institutions), Arc::clone(&guard)),
            lifecycle: PasswordLifecycleManager::new(
                Arc::clone(&gateway),
                Arc::clone(&guard),
                notifier.clone(),
                config.min_password_length,
            ),
            gateway,
            guard,
            notifier,
            worker,
        }
    }

    /// Stop accepting work and wait for pending notifications.
    pub async fn shutdown(self) {
        let Self {
            lifecycle,
            notifier,
            worker,
            ..
        } = self;
        drop(lifecycle);
        drop(notifier);
        worker.join().await;
    }

    // -----------------------------------------------------------------
    // Leadership (administrators only)
    // -----------------------------------------------------------------

    pub async fn create_leadership(
        &self,
        caller: &CallerContext,
        input: CreateIdentityInput,
    ) -> EduIdResult<UserProfile> {
        caller.require_admin()?;
        let assignment = self
            .roles
            .validate_create(
                RoleTier::Leadership,
                &input.roles,
                input.institution_id.as_deref(),
                None,
            )
            .await?;
        self.create(caller, input, assignment).await
    }

    pub async fn update_leadership(
        &self,
        caller: &CallerContext,
        id: &str,
        input: UpdateIdentityInput,
    ) -> EduIdResult<UserProfile> {
        caller.require_admin()?;
        let existing = self.fetch(id).await?;
        if !existing.is_leadership() {
            return Err(not_found(id));
        }
        let assignment = self
            .roles
            .validate_update(
                RoleTier::Leadership,
                &existing,
                input.roles.as_deref(),
                input.institution_id.as_deref(),
            )
            .await?;
        self.apply_update(existing, input, assignment).await
    }

    /// Leadership identities, optionally filtered by status.
    pub async fn list_leadership(
        &self,
        caller: &CallerContext,
        status: Option<UserStatus>,
    ) -> EduIdResult<Vec<UserProfile>> {
        caller.require_admin()?;
        self.list_where(|p| p.is_leadership() && status.is_none_or(|s| p.status == Some(s)))
            .await
    }

    pub async fn list_directors(&self, caller: &CallerContext) -> EduIdResult<Vec<UserProfile>> {
        caller.require_admin()?;
        self.list_where(|p| p.has_role(Role::Director)).await
    }

    pub async fn list_directors_by_institution(
        &self,
        caller: &CallerContext,
        institution_id: &str,
    ) -> EduIdResult<Vec<UserProfile>> {
        caller.require_admin()?;
        let institution_id = institution_id.trim();
        self.list_where(|p| {
            p.has_role(Role::Director) && p.institution_id.as_deref() == Some(institution_id)
        })
        .await
    }

    pub async fn directors_with_staff(
        &self,
        caller: &CallerContext,
    ) -> EduIdResult<Vec<DirectorWithStaff>> {
        caller.require_admin()?;
        let everyone = self.list_where(|_| true).await?;
        let directors = everyone
            .iter()
            .filter(|p| p.has_role(Role::Director))
            .map(|director| DirectorWithStaff {
                staff: everyone
                    .iter()
                    .filter(|p| p.is_staff() && p.institution_id == director.institution_id)
                    .cloned()
                    .collect(),
                director: director.clone(),
            })
            .collect();
        Ok(directors)
    }

    // -----------------------------------------------------------------
    // Staff (directors of the same institution)
    // -----------------------------------------------------------------

    pub async fn create_staff(
        &self,
        caller: &CallerContext,
        input: CreateIdentityInput,
    ) -> EduIdResult<UserProfile> {
        let institution = caller.require_director()?;
        let assignment = self
            .roles
            .validate_create(RoleTier::Staff, &input.roles, None, Some(institution))
            .await?;
        self.create(caller, input, assignment).await
    }

    /// Roles and institution of staff are never changed here.
    pub async fn update_staff(
        &self,
        caller: &CallerContext,
        id: &str,
        input: UpdateIdentityInput,
    ) -> EduIdResult<UserProfile> {
        let institution = caller.require_director()?;
        let existing = self.fetch_staff(institution, id).await?;
        let assignment = self
            .roles
            .validate_update(
                RoleTier::Staff,
                &existing,
                input.roles.as_deref(),
                input.institution_id.as_deref(),
            )
            .await?;
        self.apply_update(existing, input, assignment).await
    }

    pub async fn list_staff(&self, caller: &CallerContext) -> EduIdResult<Vec<UserProfile>> {
        let institution = caller.require_director()?;
        self.list_where(|p| p.is_staff() && p.institution_id.as_deref() == Some(institution))
            .await
    }

    pub async fn list_staff_by_role(
        &self,
        caller: &CallerContext,
        role: &str,
    ) -> EduIdResult<Vec<UserProfile>> {
        let institution = caller.require_director()?;
        let role = role.parse::<Role>().map_err(ValidationError::UnknownRole)?;
        if role.tier() != RoleTier::Staff {
            return Err(ValidationError::ForeignRole {
                role,
                tier: RoleTier::Staff,
            }
            .into());
        }
        self.list_where(|p| p.has_role(role) && p.institution_id.as_deref() == Some(institution))
            .await
    }

    // -----------------------------------------------------------------
    // Self service
    // -----------------------------------------------------------------

    pub async fn get_own_profile(&self, caller: &CallerContext) -> EduIdResult<UserProfile> {
        caller.require_member()?;
        self.fetch(&caller.caller_id).await
    }

    /// Roles, institution and status are stripped from the input.
    pub async fn update_own_profile(
        &self,
        caller: &CallerContext,
        mut input: UpdateIdentityInput,
    ) -> EduIdResult<UserProfile> {
        caller.require_member()?;
        let existing = self.fetch(&caller.caller_id).await?;
        input.roles = None;
        input.institution_id = None;
        input.status = None;
        let assignment = ValidatedRoleAssignment::unchanged(&existing);
        self.apply_update(existing, input, assignment).await
    }

    // -----------------------------------------------------------------
    // Generic lookups and status management
    // -----------------------------------------------------------------

    pub async fn get_identity(&self, caller: &CallerContext, id: &str) -> EduIdResult<UserProfile> {
        let scope = Scope::of(caller)?;
        let profile = self.fetch(id).await?;
        visible(&scope, profile, id)
    }

    pub async fn get_by_username(
        &self,
        caller: &CallerContext,
        username: &str,
    ) -> EduIdResult<UserProfile> {
        let scope = Scope::of(caller)?;
        let gateway = &self.gateway;
        let record = self
            .guard
            .read(IDENTITY_PROVIDER, "get_by_username", move || {
                gateway.get_by_username(username)
            })
            .await?;
        visible(&scope, AttributeProjector::from_representation(&record), username)
    }

    pub async fn get_by_email(&self, caller: &CallerContext, email: &str) -> EduIdResult<UserProfile> {
        let scope = Scope::of(caller)?;
        let profile = self.fetch_by_email(email).await?;
        visible(&scope, profile, email)
    }

    pub async fn list_by_status(
        &self,
        caller: &CallerContext,
        status: UserStatus,
    ) -> EduIdResult<Vec<UserProfile>> {
        let scope = Scope::of(caller)?;
        self.list_where(|p| scope.covers(p) && p.status == Some(status))
            .await
    }

    /// Set the status attribute only; the enabled flag is untouched.
    pub async fn change_status(
        &self,
        caller: &CallerContext,
        id: &str,
        status: UserStatus,
    ) -> EduIdResult<UserProfile> {
        self.get_identity(caller, id).await?;
        self.patch(
            id,
            ProfilePatch {
                status: FieldPatch::Set(status),
                updated_at: FieldPatch::Set(Utc::now()),
                ..Default::default()
            },
        )
        .await?;
        info!(user_id = %id, %status, caller = %caller.caller_id, "Identity status changed");
        self.fetch(id).await
    }

    /// Enable at the provider and set status `A`.
    pub async fn activate(&self, caller: &CallerContext, id: &str) -> EduIdResult<UserProfile> {
        self.set_access(caller, id, true).await
    }

    /// Disable at the provider and set status `I`.
    pub async fn deactivate(&self, caller: &CallerContext, id: &str) -> EduIdResult<UserProfile> {
        self.set_access(caller, id, false).await
    }

    pub async fn delete(&self, caller: &CallerContext, id: &str) -> EduIdResult<()> {
        self.get_identity(caller, id).await?;
        let gateway = &self.gateway;
        self.guard
            .call(IDENTITY_PROVIDER, "delete", gateway.delete(id))
            .await?;
        info!(user_id = %id, caller = %caller.caller_id, "Identity deleted");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Password lifecycle
    // -----------------------------------------------------------------

    /// Email a reset token to the identity known by `login`, which may
    /// be a username or an email address.
    ///
    /// Always succeeds so the answer does not reveal which identities
    /// exist.
    pub async fn request_password_reset(&self, login: &str) -> EduIdResult<()> {
        let login = login.trim();
        if login.is_empty() {
            return Ok(());
        }

        let profile = match self.find_by_login(login).await {
            Ok(profile) => profile,
            Err(EduIdError::NotFound { .. }) => {
                info!("Password reset requested for an unknown identity");
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Password reset lookup failed");
                return Ok(());
            }
        };

        match self.lifecycle.issue_reset_token(&profile.id).await {
            Ok(token) => {
                if let Some(n) = notify::password_reset(&profile, &token) {
                    self.notifier.dispatch(n);
                }
                info!(user_id = %profile.id, "Password reset token issued");
            }
            Err(e) => error!(user_id = %profile.id, error = %e, "Issuing reset token failed"),
        }
        Ok(())
    }

    /// Issue a reset token for `id` and email it to its owner.
    pub async fn issue_reset_token(&self, caller: &CallerContext, id: &str) -> EduIdResult<()> {
        let profile = self.get_identity(caller, id).await?;
        let token = self.lifecycle.issue_reset_token(id).await?;
        if let Some(n) = notify::password_reset(&profile, &token) {
            self.notifier.dispatch(n);
        }
        info!(user_id = %id, caller = %caller.caller_id, "Password reset token issued");
        Ok(())
    }

    pub async fn redeem_reset_token(&self, token: &str, new_password: &str) -> EduIdResult<UserProfile> {
        self.lifecycle.redeem_reset_token(token, new_password).await
    }

    pub async fn force_password_change(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
    ) -> EduIdResult<UserProfile> {
        self.lifecycle
            .force_change(id, current_password, new_password)
            .await
    }

    pub async fn is_password_temporary(&self, id: &str) -> EduIdResult<bool> {
        self.lifecycle.is_temporary(id).await
    }

    // -----------------------------------------------------------------
    // Cross-service lookup
    // -----------------------------------------------------------------

    pub async fn user_info_by_id(&self, id: &str) -> EduIdResult<UserInfo> {
        Ok(UserInfo::from(&self.fetch(id).await?))
    }

    pub async fn user_info_by_email(&self, email: &str) -> EduIdResult<UserInfo> {
        Ok(UserInfo::from(&self.fetch_by_email(email).await?))
    }

    // -----------------------------------------------------------------
    // Pipelines
    // -----------------------------------------------------------------

    async fn create(
        &self,
        caller: &CallerContext,
        input: CreateIdentityInput,
        assignment: ValidatedRoleAssignment,
    ) -> EduIdResult<UserProfile> {
        let username = required("username", &input.username)?;
        let email = email_field(&input.email)?;
        let document_number = required("document_number", &input.document_number)?;

        let now = Utc::now();
        let patch = ProfilePatch {
            document_type: input.document_type.into(),
            document_number: FieldPatch::Set(document_number.to_string()),
            phone: FieldPatch::from_input(input.phone.as_deref()),
            institution_id: assignment.institution_id().map(str::to_string).into(),
            status: FieldPatch::Set(input.status.unwrap_or(UserStatus::Active)),
            updated_at: FieldPatch::Set(now),
            ..Default::default()
        };
        let attributes = AttributeProjector::project_patch(&patch).apply(&AttributeBag::new());

        let gateway = &self.gateway;
        let id = self
            .guard
            .call(
                IDENTITY_PROVIDER,
                "create",
                gateway.create(NewIdentity {
                    username: username.to_string(),
                    email: email.to_string(),
                    first_name: non_blank(input.first_name.as_deref()),
                    last_name: non_blank(input.last_name.as_deref()),
                    enabled: true,
                    attributes,
                }),
            )
            .await?;

        let token = match self.provision(&id, document_number, &assignment).await {
            Ok(token) => token,
            Err(e) => {
                warn!(user_id = %id, error = %e, "Provisioning failed, removing partial identity");
                if let Err(cleanup) = self
                    .guard
                    .call(IDENTITY_PROVIDER, "delete", gateway.delete(&id))
                    .await
                {
                    error!(user_id = %id, error = %cleanup, "Removing partial identity failed");
                }
                return Err(e);
            }
        };

        let profile = match self.fetch(&id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %id, error = %e, "Re-reading created identity failed, answering from the request");
                provisioned_profile(&id, &input, &assignment, &token, now)
            }
        };
        info!(
            user_id = %id,
            username = %profile.username,
            roles = ?assignment.realm_role_names(),
            caller = %caller.caller_id,
            "Identity created"
        );
        if let Some(n) = notify::temporary_credentials(&profile, document_number, &token) {
            self.notifier.dispatch(n);
        }
        Ok(profile)
    }

    /// Temporary credential, role mapping and first reset token of a
    /// freshly created identity.
    async fn provision(
        &self,
        id: &str,
        document_number: &str,
        assignment: &ValidatedRoleAssignment,
    ) -> EduIdResult<String> {
        self.lifecycle.initialize(id, document_number).await?;
        let roles = assignment.realm_role_names();
        let gateway = &self.gateway;
        self.guard
            .call(
                IDENTITY_PROVIDER,
                "replace_realm_roles",
                gateway.replace_realm_roles(id, &roles),
            )
            .await?;
        self.lifecycle.issue_reset_token(id).await
    }

    async fn apply_update(
        &self,
        existing: UserProfile,
        input: UpdateIdentityInput,
        assignment: ValidatedRoleAssignment,
    ) -> EduIdResult<UserProfile> {
        let id = existing.id.as_str();
        let email = match non_blank(input.email.as_deref()) {
            Some(email) => Some(email_field(&email)?.to_string()),
            None => None,
        };
        let changes = IdentityChanges {
            email,
            first_name: non_blank(input.first_name.as_deref()),
            last_name: non_blank(input.last_name.as_deref()),
        };

        let gateway = &self.gateway;
        if !changes.is_empty() {
            self.guard
                .call(IDENTITY_PROVIDER, "update_names", gateway.update_names(id, changes))
                .await?;
        }

        let institution_id = if assignment.institution_changed() {
            match assignment.institution_id() {
                Some(institution) => FieldPatch::Set(institution.to_string()),
                None => FieldPatch::Clear,
            }
        } else {
            FieldPatch::Unchanged
        };
        self.patch(
            id,
            ProfilePatch {
                document_type: input.document_type.into(),
                document_number: FieldPatch::from_input(input.document_number.as_deref()),
                phone: FieldPatch::from_input(input.phone.as_deref()),
                institution_id,
                status: input.status.into(),
                updated_at: FieldPatch::Set(Utc::now()),
                ..Default::default()
            },
        )
        .await?;

        if assignment.roles_changed() {
            let roles = assignment.realm_role_names();
            self.guard
                .call(
                    IDENTITY_PROVIDER,
                    "replace_realm_roles",
                    gateway.replace_realm_roles(id, &roles),
                )
                .await?;
        }

        info!(
            user_id = %id,
            roles_changed = assignment.roles_changed(),
            institution_changed = assignment.institution_changed(),
            "Identity updated"
        );
        self.fetch(id).await
    }

    async fn set_access(&self, caller: &CallerContext, id: &str, enabled: bool) -> EduIdResult<UserProfile> {
        self.get_identity(caller, id).await?;
        let gateway = &self.gateway;
        self.guard
            .call(IDENTITY_PROVIDER, "set_enabled", gateway.set_enabled(id, enabled))
            .await?;
        let status = if enabled {
            UserStatus::Active
        } else {
            UserStatus::Inactive
        };
        self.patch(
            id,
            ProfilePatch {
                status: FieldPatch::Set(status),
                updated_at: FieldPatch::Set(Utc::now()),
                ..Default::default()
            },
        )
        .await?;
        info!(user_id = %id, enabled, caller = %caller.caller_id, "Identity access changed");
        self.fetch(id).await
    }

    /// Staff identity of `institution`. Other identities read as not
    /// found, staff of another institution as denied.
    async fn fetch_staff(&self, institution: &str, id: &str) -> EduIdResult<UserProfile> {
        let profile = self.fetch(id).await?;
        if !profile.is_staff() {
            return Err(not_found(id));
        }
        if profile.institution_id.as_deref() != Some(institution) {
            return Err(EduIdError::AuthorizationDenied {
                reason: "identity belongs to another institution".into(),
            });
        }
        Ok(profile)
    }

    async fn find_by_login(&self, login: &str) -> EduIdResult<UserProfile> {
        let gateway = &self.gateway;
        match self
            .guard
            .read(IDENTITY_PROVIDER, "get_by_username", move || {
                gateway.get_by_username(login)
            })
            .await
        {
            Ok(record) => Ok(AttributeProjector::from_representation(&record)),
            Err(EduIdError::NotFound { .. }) => self.fetch_by_email(login).await,
            Err(e) => Err(e),
        }
    }

    async fn list_where(&self, keep: impl Fn(&UserProfile) -> bool) -> EduIdResult<Vec<UserProfile>> {
        let gateway = &self.gateway;
        let records = self
            .guard
            .read(IDENTITY_PROVIDER, "list_all", move || gateway.list_all())
            .await?;
        Ok(records
            .iter()
            .map(AttributeProjector::from_representation)
            .filter(|p| keep(p))
            .collect())
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

    async fn fetch_by_email(&self, email: &str) -> EduIdResult<UserProfile> {
        let gateway = &self.gateway;
        let record = self
            .guard
            .read(IDENTITY_PROVIDER, "get_by_email", move || {
                gateway.get_by_email(email)
            })
            .await?;
        Ok(AttributeProjector::from_representation(&record))
    }
}

fn not_found(id: &str) -> EduIdError {
    EduIdError::NotFound {
        entity: "identity".into(),
        id: id.to_string(),
    }
}

fn visible(scope: &Scope<'_>, profile: UserProfile, key: &str) -> EduIdResult<UserProfile> {
    if scope.covers(&profile) {
        Ok(profile)
    } else {
        Err(not_found(key))
    }
}

/// Profile of a freshly provisioned identity, as written.
fn provisioned_profile(
    id: &str,
    input: &CreateIdentityInput,
    assignment: &ValidatedRoleAssignment,
    reset_token: &str,
    now: DateTime<Utc>,
) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        username: input.username.trim().to_lowercase(),
        email: Some(input.email.trim().to_lowercase()),
        first_name: non_blank(input.first_name.as_deref()),
        last_name: non_blank(input.last_name.as_deref()),
        document_type: input.document_type,
        document_number: non_blank(Some(input.document_number.as_str())),
        phone: non_blank(input.phone.as_deref()),
        institution_id: assignment.institution_id().map(str::to_string),
        roles: assignment.roles().clone(),
        status: Some(input.status.unwrap_or(UserStatus::Active)),
        password_status: Some(PasswordStatus::Temporary),
        password_created_at: Some(now),
        reset_token: Some(token::hash_reset_token(reset_token)),
        enabled: true,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must not be blank".into(),
        });
    }
    Ok(value)
}

fn email_field(value: &str) -> Result<&str, ValidationError> {
    let value = required("email", value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(value),
        _ => Err(ValidationError::InvalidField {
            field: "email",
            reason: "must be an email address".into(),
        }),
    }
}
