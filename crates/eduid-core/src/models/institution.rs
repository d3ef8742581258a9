//! Institution validation result.

use serde::{Deserialize, Serialize};

/// Answer of the institution service for one institution id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InstitutionStatus {
    pub name: Option<String>,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub active: bool,
    /// `A` when active, absent when the institution does not exist.
    pub status: Option<String>,
    /// Set when the service rejected the id itself (e.g. malformed).
    pub error: Option<String>,
}
