use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "products.read"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

const MANAGED_RESOURCES: [&str; 5] = ["customers", "suppliers", "products", "purchases", "sales"];
const WRITE_ACTIONS: [&str; 3] = ["create", "update", "delete"];

const STAFF: [&str; 5] = [
    "customers.read",
    "customers.create",
    "products.read",
    "sales.read",
    "sales.create",
];

/// Static role policy.
///
/// Unknown roles grant nothing.
pub fn role_permissions(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        "admin" => vec![Permission::from_static("*")],
        "manager" => {
            let mut perms = Vec::with_capacity(MANAGED_RESOURCES.len() * 4 + 2);
            for resource in MANAGED_RESOURCES {
                perms.push(Permission::new(format!("{resource}.read")));
                for action in WRITE_ACTIONS {
                    perms.push(Permission::new(format!("{resource}.{action}")));
                }
            }
            perms.push(Permission::from_static("users.read"));
            perms.push(Permission::from_static("reports.read"));
            perms
        }
        "staff" => STAFF.into_iter().map(Permission::from_static).collect(),
        _ => Vec::new(),
    }
}
