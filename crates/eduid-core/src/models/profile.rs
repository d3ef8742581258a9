//! Staff identity profile as seen by the domain.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// Identity document kinds accepted for staff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// National identity document.
    Dni,
    /// Foreigner's identity card.
    Ce,
    Passport,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    #[serde(rename = "A")]
    Active,
    #[serde(rename = "I")]
    Inactive,
}

/// Lifecycle of the credential held by the identity provider.
///
/// `Temporary` is only ever set at creation; the single transition is
/// `Temporary -> Permanent`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PasswordStatus {
    Temporary,
    Permanent,
}

macro_rules! wire_enum {
    ($ty:ty { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            /// Value stored in the attribute bag.
            pub fn as_wire(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_wire())
            }
        }

        /// Exact match against the stored wire value.
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(other.to_string()),
                }
            }
        }
    };
}

wire_enum!(DocumentType { Dni => "DNI", Ce => "CE", Passport => "PASSPORT" });
wire_enum!(UserStatus { Active => "A", Inactive => "I" });
wire_enum!(PasswordStatus { Temporary => "TEMPORARY", Permanent => "PERMANENT" });

/// Full domain view of one identity.
///
/// Optional fields read back as `None` mean "unknown" (absent or
/// unparsable in the attribute bag), not "invalid".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub institution_id: Option<String>,
    pub roles: BTreeSet<Role>,
    pub status: Option<UserStatus>,
    pub password_status: Option<PasswordStatus>,
    pub password_created_at: Option<DateTime<Utc>>,
    /// Stored digest of the live reset token, if any.
    pub reset_token: Option<String>,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_leadership(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::Director)
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(Role::Teacher) || self.has_role(Role::Auxiliary) || self.has_role(Role::Secretary)
    }

    /// "First Last", either name alone, or the username as a fallback.
    pub fn display_name(&self) -> String {
        full_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            &self.username,
        )
    }
}

fn full_name(first: Option<&str>, last: Option<&str>, fallback: &str) -> String {
    let first = first.map(str::trim).filter(|s| !s.is_empty());
    let last = last.map(str::trim).filter(|s| !s.is_empty());
    match (first, last) {
        (Some(f), Some(l)) => format!("{f} {l}"),
        (Some(n), None) | (None, Some(n)) => n.to_string(),
        (None, None) => fallback.to_string(),
    }
}

/// Projection served to other platform services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub institution_id: Option<String>,
    /// `A` or `I`; unknown status reads as `I`.
    pub status: UserStatus,
    /// Enabled at the provider and status `A`.
    pub has_access: bool,
}

impl From<&UserProfile> for UserInfo {
    fn from(profile: &UserProfile) -> Self {
        let status = profile.status.unwrap_or(UserStatus::Inactive);
        Self {
            id: profile.id.clone(),
            email: profile.email.clone(),
            roles: profile.roles.iter().copied().collect(),
            institution_id: profile.institution_id.clone(),
            status,
            has_access: profile.enabled && status == UserStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u-1".into(),
            username: "jdoe".into(),
            email: Some("jdoe@school.edu".into()),
            first_name: None,
            last_name: None,
            document_type: None,
            document_number: None,
            phone: None,
            institution_id: None,
            roles: BTreeSet::from([Role::Teacher]),
            status: None,
            password_status: None,
            password_created_at: None,
            reset_token: None,
            enabled: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn wire_values_are_exact() {
        assert_eq!("DNI".parse::<DocumentType>(), Ok(DocumentType::Dni));
        assert!("dni".parse::<DocumentType>().is_err());
        assert_eq!(PasswordStatus::Temporary.as_wire(), "TEMPORARY");
        assert_eq!(UserStatus::Inactive.to_string(), "I");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut p = profile();
        assert_eq!(p.display_name(), "jdoe");
        p.last_name = Some(" Doe ".into());
        assert_eq!(p.display_name(), "Doe");
        p.first_name = Some("Jane".into());
        assert_eq!(p.display_name(), "Jane Doe");
    }

    #[test]
    fn user_info_requires_enabled_and_active() {
        let mut p = profile();
        assert!(!UserInfo::from(&p).has_access);
        assert_eq!(UserInfo::from(&p).status, UserStatus::Inactive);

        p.status = Some(UserStatus::Active);
        assert!(UserInfo::from(&p).has_access);

        p.enabled = false;
        assert!(!UserInfo::from(&p).has_access);
    }
}
