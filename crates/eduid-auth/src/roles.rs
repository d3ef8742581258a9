//! Role hierarchy validation and caller context.
//!
//! Every role request passes through [`RoleHierarchyValidator`] before
//! anything is written. Its output, [`ValidatedRoleAssignment`], carries
//! the final roles and institution so downstream code never re-derives
//! policy.

use std::collections::BTreeSet;
use std::sync::Arc;

use eduid_core::error::{EduIdError, EduIdResult, ValidationError};
use eduid_core::gateway::InstitutionValidator;
use eduid_core::models::profile::UserProfile;
use eduid_core::models::role::{Role, RoleTier};
use tracing::debug;

use crate::upstream::{INSTITUTION_SERVICE, UpstreamGuard};

/// Identity of the party making a request, as asserted by the gateway
/// in front of this service.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub caller_id: String,
    roles: BTreeSet<Role>,
    pub institution_id: Option<String>,
}

impl CallerContext {
    /// Role names are matched case-insensitively; unknown names are
    /// ignored.
    pub fn new<S: AsRef<str>>(
        caller_id: impl Into<String>,
        roles: impl IntoIterator<Item = S>,
        institution_id: Option<String>,
    ) -> Self {
        Self {
            caller_id: caller_id.into(),
            roles: roles
                .into_iter()
                .filter_map(|r| r.as_ref().parse::<Role>().ok())
                .collect(),
            institution_id: institution_id
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty()),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn require_admin(&self) -> EduIdResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(denied("administrator role required"))
        }
    }

    /// Returns the director's institution.
    pub fn require_director(&self) -> EduIdResult<&str> {
        if !self.has_role(Role::Director) {
            return Err(denied("director role required"));
        }
        self.institution_id
            .as_deref()
            .ok_or_else(|| denied("director has no institution assigned"))
    }

    /// Self-service access: staff or director with an institution.
    pub fn require_member(&self) -> EduIdResult<&str> {
        let member = self.has_role(Role::Director) || RoleTier::Staff.roles().any(|r| self.has_role(r));
        if !member {
            return Err(denied("staff or director role required"));
        }
        self.institution_id
            .as_deref()
            .ok_or_else(|| denied("caller has no institution assigned"))
    }
}

fn denied(reason: &str) -> EduIdError {
    EduIdError::AuthorizationDenied {
        reason: reason.to_string(),
    }
}

/// Final role set and institution of an identity, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRoleAssignment {
    roles: BTreeSet<Role>,
    institution_id: Option<String>,
    roles_changed: bool,
    institution_changed: bool,
}

impl ValidatedRoleAssignment {
    /// Leaves roles and institution as stored.
    pub fn unchanged(existing: &UserProfile) -> Self {
        Self {
            roles: existing.roles.clone(),
            institution_id: existing.institution_id.clone(),
            roles_changed: false,
            institution_changed: false,
        }
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn institution_id(&self) -> Option<&str> {
        self.institution_id.as_deref()
    }

    pub fn roles_changed(&self) -> bool {
        self.roles_changed
    }

    pub fn institution_changed(&self) -> bool {
        self.institution_changed
    }

    /// Realm role names in the provider's spelling.
    pub fn realm_role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}

pub struct RoleHierarchyValidator<I: InstitutionValidator> {
    institutions: Arc<I>,
    guard: Arc<UpstreamGuard>,
}

impl<I: InstitutionValidator> RoleHierarchyValidator<I> {
    pub fn new(institutions: Arc<I>, guard: Arc<UpstreamGuard>) -> Self {
        Self { institutions, guard }
    }

    /// Validate the roles of a new identity created through `tier`.
    ///
    /// Leadership takes the institution from the request; staff always
    /// gets the caller's institution.
    pub async fn validate_create(
        &self,
        tier: RoleTier,
        requested_roles: &[String],
        requested_institution: Option<&str>,
        caller_institution: Option<&str>,
    ) -> EduIdResult<ValidatedRoleAssignment> {
        let roles = parse_roles(tier, requested_roles)?;
        ensure_compatible(&roles)?;

        let institution_id = match tier {
            RoleTier::Staff => Some(
                non_blank(caller_institution)
                    .ok_or(ValidationError::MissingInstitution)?
                    .to_string(),
            ),
            RoleTier::Leadership => self.leadership_institution(&roles, requested_institution, None).await?,
        };

        Ok(ValidatedRoleAssignment {
            roles,
            institution_changed: institution_id.is_some(),
            institution_id,
            roles_changed: true,
        })
    }

    /// Validate an update of `existing` through `tier`.
    ///
    /// Staff updates never change roles or institution; whatever was
    /// requested is stripped. Leadership updates fall back to the
    /// stored roles and institution for anything not requested.
    pub async fn validate_update(
        &self,
        tier: RoleTier,
        existing: &UserProfile,
        requested_roles: Option<&[String]>,
        requested_institution: Option<&str>,
    ) -> EduIdResult<ValidatedRoleAssignment> {
        if tier == RoleTier::Staff {
            if requested_roles.is_some_and(|r| !r.is_empty()) || non_blank(requested_institution).is_some() {
                debug!(user_id = %existing.id, "Stripping role and institution changes from staff update");
            }
            return Ok(ValidatedRoleAssignment::unchanged(existing));
        }

        let requested = requested_roles.unwrap_or_default();
        let roles = if requested.iter().all(|r| r.trim().is_empty()) {
            let kept: BTreeSet<Role> = existing
                .roles
                .iter()
                .copied()
                .filter(|r| r.tier() == RoleTier::Leadership)
                .collect();
            if kept.is_empty() {
                BTreeSet::from([RoleTier::Leadership.default_role()])
            } else {
                kept
            }
        } else {
            parse_roles(RoleTier::Leadership, requested)?
        };
        ensure_compatible(&roles)?;

        let institution_id = self
            .leadership_institution(&roles, requested_institution, Some(existing))
            .await?;

        Ok(ValidatedRoleAssignment {
            roles_changed: roles != existing.roles,
            institution_changed: institution_id != existing.institution_id,
            roles,
            institution_id,
        })
    }

    /// Institution of a leadership identity holding `roles`.
    ///
    /// On update the lookup is skipped when a director keeps the same
    /// institution.
    async fn leadership_institution(
        &self,
        roles: &BTreeSet<Role>,
        requested: Option<&str>,
        existing: Option<&UserProfile>,
    ) -> EduIdResult<Option<String>> {
        if !roles.contains(&Role::Director) {
            if non_blank(requested).is_some() {
                debug!("Ignoring institution requested for an administrator");
            }
            return Ok(None);
        }

        let institution_id = non_blank(requested)
            .or_else(|| existing.and_then(|p| non_blank(p.institution_id.as_deref())))
            .ok_or(ValidationError::MissingInstitution)?;

        let unchanged = existing.is_some_and(|p| {
            p.has_role(Role::Director) && p.institution_id.as_deref() == Some(institution_id)
        });
        if !unchanged {
            self.check_institution(institution_id).await?;
        }
        Ok(Some(institution_id.to_string()))
    }

    async fn check_institution(&self, institution_id: &str) -> EduIdResult<()> {
        let institutions = &self.institutions;
        let status = self
            .guard
            .read(INSTITUTION_SERVICE, "validate", move || {
                institutions.validate(institution_id)
            })
            .await?;

        if let Some(reason) = status.error {
            return Err(ValidationError::InstitutionRejected {
                institution_id: institution_id.to_string(),
                reason,
            }
            .into());
        }
        if !status.exists {
            return Err(ValidationError::InstitutionNotFound {
                institution_id: institution_id.to_string(),
            }
            .into());
        }
        if !status.active {
            return Err(ValidationError::InstitutionInactive {
                institution_id: institution_id.to_string(),
                name: status.name.unwrap_or_default(),
            }
            .into());
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse requested role names against the entry point's tier.
///
/// Blank entries are ignored; no roles at all means the tier default.
fn parse_roles(tier: RoleTier, requested: &[String]) -> Result<BTreeSet<Role>, ValidationError> {
    let mut roles = BTreeSet::new();
    for name in requested.iter().filter(|n| !n.trim().is_empty()) {
        let role = name.parse::<Role>().map_err(ValidationError::UnknownRole)?;
        if role.tier() != tier {
            return Err(ValidationError::ForeignRole { role, tier });
        }
        roles.insert(role);
    }
    if roles.is_empty() {
        roles.insert(tier.default_role());
    }
    Ok(roles)
}

/// `admin` cannot carry an institution and `director` must, so the two
/// are never held together.
fn ensure_compatible(roles: &BTreeSet<Role>) -> Result<(), ValidationError> {
    if roles.contains(&Role::Admin) && roles.contains(&Role::Director) {
        return Err(ValidationError::IncompatibleRoles(vec![Role::Admin, Role::Director]));
    }
    Ok(())
}
