//! Role domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Realm-level role held by a staff identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Director,
    Teacher,
    Auxiliary,
    Secretary,
}

/// The two disjoint tiers roles are partitioned into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoleTier {
    Leadership,
    Staff,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Director,
        Role::Teacher,
        Role::Auxiliary,
        Role::Secretary,
    ];

    pub fn tier(self) -> RoleTier {
        match self {
            Role::Admin | Role::Director => RoleTier::Leadership,
            Role::Teacher | Role::Auxiliary | Role::Secretary => RoleTier::Staff,
        }
    }

    /// Realm role name as stored by the identity provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Director => "director",
            Role::Teacher => "teacher",
            Role::Auxiliary => "auxiliary",
            Role::Secretary => "secretary",
        }
    }
}

impl RoleTier {
    /// Role assigned when a request through this tier names none.
    pub fn default_role(self) -> Role {
        match self {
            RoleTier::Leadership => Role::Admin,
            RoleTier::Staff => Role::Teacher,
        }
    }

    pub fn roles(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| r.tier() == self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RoleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleTier::Leadership => f.write_str("leadership"),
            RoleTier::Staff => f.write_str("staff"),
        }
    }
}

/// Case-insensitive; surrounding whitespace is ignored.
impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| trimmed.to_string())
    }
}
