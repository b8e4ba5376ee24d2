use stockroom_auth::{Principal, Role};
use stockroom_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware from verified access-token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    username: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn to_principal(&self) -> Principal {
        Principal::from_roles(self.user_id, self.username.clone(), self.roles.clone())
    }
}
