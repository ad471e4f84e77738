//! Role names and the registration allow-lists that grant them.
//!
//! Role names must match the values stored in the `owner_role` and
//! `actor_role` columns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_USER: &str = "user";
pub const ROLE_SYSTEM: &str = "system";

/// Role of an actor on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
    /// Synthetic actor used by automated jobs. Never issued to a person.
    System,
}

impl Role {
    /// Parse from the stored role name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_MANAGER => Ok(Self::Manager),
            ROLE_USER => Ok(Self::User),
            ROLE_SYSTEM => Ok(Self::System),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }

    /// Stored role name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Manager => ROLE_MANAGER,
            Self::User => ROLE_USER,
            Self::System => ROLE_SYSTEM,
        }
    }

    /// Admins and managers may act on any solicitation.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Externally configured registration IDs that carry staff roles.
///
/// Anyone not listed resolves to [`Role::User`]. A registration present in
/// both lists resolves to [`Role::Admin`].
#[derive(Debug, Clone, Default)]
pub struct RoleAllowList {
    admins: HashSet<String>,
    managers: HashSet<String>,
}

impl RoleAllowList {
    pub fn new<A, M>(admins: A, managers: M) -> Self
    where
        A: IntoIterator<Item = String>,
        M: IntoIterator<Item = String>,
    {
        Self {
            admins: admins.into_iter().map(|r| r.trim().to_string()).collect(),
            managers: managers.into_iter().map(|r| r.trim().to_string()).collect(),
        }
    }

    /// Parse two comma-separated lists (the `ADMIN_REGISTRATIONS` and
    /// `MANAGER_REGISTRATIONS` format). Empty entries are dropped.
    pub fn from_csv(admins: &str, managers: &str) -> Self {
        fn split(list: &str) -> Vec<String> {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }
        Self::new(split(admins), split(managers))
    }

    pub fn resolve(&self, registration: &str) -> Role {
        if self.admins.contains(registration) {
            Role::Admin
        } else if self.managers.contains(registration) {
            Role::Manager
        } else {
            Role::User
        }
    }
}
