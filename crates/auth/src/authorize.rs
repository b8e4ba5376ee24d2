use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use stockroom_core::UserId;

use crate::{role_permissions, Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built from verified token claims; permissions are derived from roles by the
/// static policy so tokens never carry permissions directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
    pub permissions: BTreeSet<Permission>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

impl Principal {
    pub fn from_roles(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        let permissions = roles.iter().flat_map(role_permissions).collect();
        Self {
            user_id,
            username: username.into(),
            roles,
            permissions,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }
}

/// Pure policy check: wildcard or exact permission match.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
