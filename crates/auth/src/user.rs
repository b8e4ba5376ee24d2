//! User accounts.
//!
//! Accounts are plain persisted records; the lifecycle rules (suspension,
//! self-protection for admins, role uniqueness) are enforced here so every
//! caller gets the same behaviour.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{required_text, validate_email};
use stockroom_core::{DomainError, DomainResult, Entity, Timestamps, UserId};

use crate::Role;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const DISPLAY_NAME_MAX: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "ACTIVE"),
            UserStatus::Suspended => write!(f, "SUSPENDED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    display_name: String,
    password_hash: String,
    roles: Vec<Role>,
    status: UserStatus,
    last_login_at: Option<DateTime<Utc>>,
    version: u64,
    timestamps: Timestamps,
}

/// Account fields supplied by an administrator. The password travels
/// separately and arrives here already hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Lowercase, 3..=32 chars of `[a-z0-9._-]`.
pub fn normalize_username(raw: &str) -> DomainResult<String> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(DomainError::validation(format!(
            "username must be {USERNAME_MIN} to {USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(username)
}

fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    validate_email(&email)?;
    Ok(email)
}

impl User {
    pub fn create(input: NewUser, password_hash: String, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut roles: Vec<Role> = Vec::with_capacity(input.roles.len().max(1));
        for role in &input.roles {
            let role = Role::parse_known(role.as_str())?;
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        if roles.is_empty() {
            roles.push(Role::STAFF);
        }

        Ok(Self {
            id: UserId::new(),
            username: normalize_username(&input.username)?,
            email: normalize_email(&input.email)?,
            display_name: required_text("display_name", &input.display_name, DISPLAY_NAME_MAX)?,
            password_hash,
            roles,
            status: UserStatus::Active,
            last_login_at: None,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    pub fn update_profile(&mut self, patch: UserPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let email = match patch.email {
            Some(email) => normalize_email(&email)?,
            None => self.email.clone(),
        };
        let display_name = match patch.display_name {
            Some(name) => required_text("display_name", &name, DISPLAY_NAME_MAX)?,
            None => self.display_name.clone(),
        };

        self.email = email;
        self.display_name = display_name;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn set_password_hash(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.timestamps.touch(now);
    }

    pub fn assign_role(&mut self, role: Role, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_not_suspended()?;
        let role = Role::parse_known(role.as_str())?;
        if self.has_role(&role) {
            return Err(DomainError::invariant(format!("role '{role}' already assigned")));
        }
        self.roles.push(role);
        self.timestamps.touch(now);
        Ok(())
    }

    /// `actor` is the user performing the change.
    pub fn revoke_role(&mut self, role: &Role, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.has_role(role) {
            return Err(DomainError::invariant(format!("role '{role}' is not assigned")));
        }
        if actor == self.id && role.is_admin() {
            return Err(DomainError::invariant("cannot revoke your own admin role"));
        }
        self.roles.retain(|r| r != role);
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn suspend(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if actor == self.id {
            return Err(DomainError::invariant("cannot suspend yourself"));
        }
        self.ensure_not_suspended()?;
        self.status = UserStatus::Suspended;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != UserStatus::Suspended {
            return Err(DomainError::invariant("user is not suspended"));
        }
        self.status = UserStatus::Active;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
    }

    pub fn can_authenticate(&self) -> bool {
        self.status == UserStatus::Active
    }

    fn ensure_not_suspended(&self) -> DomainResult<()> {
        if self.status == UserStatus::Suspended {
            return Err(DomainError::invariant("user is suspended"));
        }
        Ok(())
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }
}

impl Entity for User {
    type Id = UserId;
    const TABLE: &'static str = "users";
    const KIND: &'static str = "user";

    fn id(&self) -> UserId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_user(username: &str, roles: Vec<Role>) -> User {
        User::create(
            NewUser {
                username: username.into(),
                email: format!("{}@Example.com", username.trim()),
                display_name: "Some One".into(),
                roles,
            },
            "$argon2id$placeholder".into(),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn create_normalizes_username_and_email() {
        let user = new_user("  Alice ", vec![]);
        assert_eq!(user.username(), "alice");
        assert_eq!(user.email(), "alice@example.com");
        assert_eq!(user.roles(), &[Role::STAFF]);
        assert_eq!(user.status(), UserStatus::Active);
        assert!(user.last_login_at().is_none());
    }

    #[test]
    fn create_rejects_bad_username() {
        let err = User::create(
            NewUser {
                username: "a b".into(),
                email: "ab@example.com".into(),
                display_name: "A B".into(),
                roles: vec![],
            },
            String::new(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_unknown_role_and_dedupes_known() {
        let err = User::create(
            NewUser {
                username: "bob".into(),
                email: "bob@example.com".into(),
                display_name: "Bob".into(),
                roles: vec![Role::new("superuser")],
            },
            String::new(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let user = new_user("carol", vec![Role::MANAGER, Role::new("Manager")]);
        assert_eq!(user.roles(), &[Role::MANAGER]);
    }

    #[test]
    fn assign_and_revoke_roles() {
        let admin = new_user("root", vec![Role::ADMIN]);
        let mut user = new_user("dave", vec![]);

        user.assign_role(Role::MANAGER, now()).unwrap();
        assert!(user.has_role(&Role::MANAGER));

        let err = user.assign_role(Role::MANAGER, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        user.revoke_role(&Role::MANAGER, admin.id(), now()).unwrap();
        assert!(!user.has_role(&Role::MANAGER));
    }

    #[test]
    fn admin_cannot_revoke_own_admin_role() {
        let mut admin = new_user("root", vec![Role::ADMIN]);
        let id = admin.id();
        let err = admin.revoke_role(&Role::ADMIN, id, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(admin.has_role(&Role::ADMIN));
    }

    #[test]
    fn suspended_user_cannot_authenticate_or_gain_roles() {
        let admin = new_user("root", vec![Role::ADMIN]);
        let mut user = new_user("erin", vec![]);

        user.suspend(admin.id(), now()).unwrap();
        assert!(!user.can_authenticate());
        assert!(user.assign_role(Role::MANAGER, now()).is_err());
        assert!(user.suspend(admin.id(), now()).is_err());

        user.activate(now()).unwrap();
        assert!(user.can_authenticate());
        assert!(user.activate(now()).is_err());
    }

    #[test]
    fn cannot_suspend_self() {
        let mut admin = new_user("root", vec![Role::ADMIN]);
        let id = admin.id();
        assert!(admin.suspend(id, now()).is_err());
    }

    #[test]
    fn record_login_sets_timestamp() {
        let mut user = new_user("frank", vec![]);
        let at = now();
        user.record_login(at);
        assert_eq!(user.last_login_at(), Some(at));
    }

    #[test]
    fn update_profile_keeps_absent_fields() {
        let mut user = new_user("gina", vec![]);
        user.update_profile(
            UserPatch {
                display_name: Some("Gina G".into()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(user.display_name(), "Gina G");
        assert_eq!(user.email(), "gina@example.com");

        assert!(user
            .update_profile(
                UserPatch {
                    email: Some("nope".into()),
                    ..Default::default()
                },
                now(),
            )
            .is_err());
        assert_eq!(user.email(), "gina@example.com");
    }
}
