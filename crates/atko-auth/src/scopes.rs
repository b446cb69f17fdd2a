//! Resource kinds and the OAuth scopes each one needs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Management resources that call the API with their own token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "UserMgr")]
    Users,
    #[serde(rename = "GroupMgr")]
    Groups,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[Self::Users, Self::Groups];

    /// Name used as the token cache key
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "UserMgr",
            Self::Groups => "GroupMgr",
        }
    }

    /// Scopes requested by user-delegated flows
    pub fn user_scopes(&self) -> &'static [&'static str] {
        match self {
            Self::Users => &[
                "okta.users.manage",
                "okta.users.read",
                "okta.users.manage.self",
                "okta.users.read.self",
            ],
            Self::Groups => &["okta.groups.manage", "okta.groups.read"],
        }
    }

    /// Scopes requested by the client credentials flow
    pub fn service_scopes(&self) -> &'static [&'static str] {
        match self {
            Self::Users => &["okta.users.manage", "okta.users.read"],
            Self::Groups => &["okta.groups.manage", "okta.groups.read"],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(ResourceKind::name).collect();
                AuthError::Configuration(format!(
                    "'{s}' is not a valid management resource; supported resources are [{}]",
                    names.join(", ")
                ))
            })
    }
}
