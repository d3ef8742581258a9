//! Outbound notification requests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent after creation: temporary password and a reset token.
    TemporaryCredentials,
    /// Sent on a reset request: the reset token.
    PasswordReset,
    /// Sent after the credential became permanent.
    PasswordChanged,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemporaryCredentials => f.write_str("temporary_credentials"),
            Self::PasswordReset => f.write_str("password_reset"),
            Self::PasswordChanged => f.write_str("password_changed"),
        }
    }
}

/// One email to render and deliver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub to_email: String,
    pub template_data: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, to_email: impl Into<String>) -> Self {
        Self {
            kind,
            to_email: to_email.into(),
            template_data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.template_data.insert(key.to_string(), value.into());
        self
    }
}
