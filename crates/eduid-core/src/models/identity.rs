//! Identity records as exchanged with the identity provider.

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeBag;

/// Raw identity as returned by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    /// Creation instant in Unix milliseconds.
    pub created_timestamp: Option<i64>,
    pub attributes: AttributeBag,
    /// Realm-level role assignment, read from the provider's role mapping.
    pub realm_roles: Vec<String>,
}

/// Input for creating an identity at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub attributes: AttributeBag,
}

/// Changes to the provider's native (non-attribute) fields.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IdentityChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl IdentityChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}
