//! Projection between [`UserProfile`] and the provider's attribute bag.
//!
//! Writes are merge patches: a field that is absent or blank on the
//! input never touches the stored key. Reads are lenient: anything
//! that fails to parse becomes `None` and is reported as a
//! [`ParseAnomaly`] instead of failing the whole read.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::attributes::{AttributeBag, AttributePatch, FieldPatch, first_value, keys};
use crate::models::identity::IdentityRecord;
use crate::models::profile::{DocumentType, PasswordStatus, UserProfile, UserStatus};
use crate::models::role::Role;

/// A stored attribute that could not be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAnomaly {
    #[error("attribute {key} holds unknown value {value:?}")]
    UnknownVariant { key: String, value: String },

    #[error("attribute {key} holds malformed timestamp {value:?}")]
    MalformedTimestamp { key: String, value: String },
}

/// Typed partial update of the attribute-backed profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub document_type: FieldPatch<DocumentType>,
    pub document_number: FieldPatch<String>,
    pub phone: FieldPatch<String>,
    pub institution_id: FieldPatch<String>,
    pub status: FieldPatch<UserStatus>,
    pub password_status: FieldPatch<PasswordStatus>,
    pub password_created_at: FieldPatch<DateTime<Utc>>,
    pub reset_token: FieldPatch<String>,
    pub updated_at: FieldPatch<DateTime<Utc>>,
}

fn non_blank(value: &Option<String>) -> FieldPatch<String> {
    FieldPatch::from_input(value.as_deref())
}

impl From<&UserProfile> for ProfilePatch {
    /// Everything present and non-blank is set; nothing is cleared.
    fn from(profile: &UserProfile) -> Self {
        Self {
            document_type: profile.document_type.into(),
            document_number: non_blank(&profile.document_number),
            phone: non_blank(&profile.phone),
            institution_id: non_blank(&profile.institution_id),
            status: profile.status.into(),
            password_status: profile.password_status.into(),
            password_created_at: profile.password_created_at.into(),
            reset_token: non_blank(&profile.reset_token),
            updated_at: profile.updated_at.into(),
        }
    }
}

/// Canonical textual form of stored timestamps (RFC 3339, UTC).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub struct AttributeProjector;

impl AttributeProjector {
    /// Merge patch writing every populated attribute-backed field of
    /// `profile`. Apply it to the existing bag to get the stored state.
    pub fn to_attributes(profile: &UserProfile) -> AttributePatch {
        Self::project_patch(&ProfilePatch::from(profile))
    }

    pub fn project_patch(patch: &ProfilePatch) -> AttributePatch {
        let mut out = AttributePatch::new();
        out.put(
            keys::DOCUMENT_TYPE,
            patch.document_type.clone().map(|v| v.as_wire().to_string()),
        )
        .put(keys::DOCUMENT_NUMBER, patch.document_number.clone())
        .put(keys::PHONE, patch.phone.clone())
        .put(keys::INSTITUTION_ID, patch.institution_id.clone())
        .put(
            keys::STATUS,
            patch.status.clone().map(|v| v.as_wire().to_string()),
        )
        .put(
            keys::PASSWORD_STATUS,
            patch
                .password_status
                .clone()
                .map(|v| v.as_wire().to_string()),
        )
        .put(
            keys::PASSWORD_CREATED_AT,
            patch.password_created_at.clone().map(|v| format_timestamp(&v)),
        )
        .put(keys::PASSWORD_RESET_TOKEN, patch.reset_token.clone())
        .put(
            keys::UPDATED_AT,
            patch.updated_at.clone().map(|v| format_timestamp(&v)),
        );
        out
    }

    /// Build the domain profile from a provider record.
    ///
    /// Never fails; anomalies are logged and the field reads as `None`.
    pub fn from_representation(record: &IdentityRecord) -> UserProfile {
        let bag = &record.attributes;
        UserProfile {
            id: record.id.clone(),
            username: record.username.clone(),
            email: non_empty(record.email.as_deref()),
            first_name: non_empty(record.first_name.as_deref()),
            last_name: non_empty(record.last_name.as_deref()),
            document_type: logged(&record.id, Self::read_enum(bag, keys::DOCUMENT_TYPE)),
            document_number: first_value(bag, keys::DOCUMENT_NUMBER).map(str::to_string),
            phone: first_value(bag, keys::PHONE).map(str::to_string),
            institution_id: first_value(bag, keys::INSTITUTION_ID).map(str::to_string),
            roles: Self::parse_roles(&record.realm_roles),
            status: logged(&record.id, Self::read_enum(bag, keys::STATUS)),
            password_status: logged(&record.id, Self::read_enum(bag, keys::PASSWORD_STATUS)),
            password_created_at: logged(
                &record.id,
                Self::read_timestamp(bag, keys::PASSWORD_CREATED_AT),
            ),
            reset_token: first_value(bag, keys::PASSWORD_RESET_TOKEN).map(str::to_string),
            enabled: record.enabled,
            created_at: record
                .created_timestamp
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            updated_at: logged(&record.id, Self::read_timestamp(bag, keys::UPDATED_AT)),
        }
    }

    /// Read an enum-valued attribute. Missing reads as `Ok(None)`.
    pub fn read_enum<T: FromStr>(bag: &AttributeBag, key: &str) -> Result<Option<T>, ParseAnomaly> {
        match first_value(bag, key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| ParseAnomaly::UnknownVariant {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Read a timestamp attribute.
    ///
    /// Accepts RFC 3339 and, for older records, zone-less ISO local
    /// date-times which are taken as UTC.
    pub fn read_timestamp(
        bag: &AttributeBag,
        key: &str,
    ) -> Result<Option<DateTime<Utc>>, ParseAnomaly> {
        let Some(raw) = first_value(bag, key) else {
            return Ok(None);
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|_| ParseAnomaly::MalformedTimestamp {
                key: key.to_string(),
                value: raw.to_string(),
            })
    }

    /// Domain roles out of the provider's role mapping.
    ///
    /// Provider-internal roles (e.g. `offline_access`) are skipped.
    pub fn parse_roles(realm_roles: &[String]) -> BTreeSet<Role> {
        realm_roles
            .iter()
            .filter_map(|name| match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    debug!(role = %name, "Ignoring non-domain realm role");
                    None
                }
            })
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn logged<T>(id: &str, read: Result<Option<T>, ParseAnomaly>) -> Option<T> {
    read.unwrap_or_else(|anomaly| {
        warn!(user_id = %id, %anomaly, "Treating unreadable attribute as unknown");
        None
    })
}
