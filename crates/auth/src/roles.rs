use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

/// Role identifier used for RBAC.
///
/// Stored as an opaque lowercase string; `role_permissions` maps the
/// well-known names to permission sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const MANAGER: Role = Role(Cow::Borrowed("manager"));
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse a role name supplied by a client, accepting only known roles.
    pub fn parse_known(name: &str) -> DomainResult<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        [Self::ADMIN, Self::MANAGER, Self::STAFF]
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{}'", name.trim())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == "admin"
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_is_case_insensitive() {
        assert_eq!(Role::parse_known(" Manager ").unwrap(), Role::MANAGER);
        assert!(Role::parse_known("ADMIN").unwrap().is_admin());
    }

    #[test]
    fn parse_known_rejects_unknown_roles() {
        let err = Role::parse_known("root").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
