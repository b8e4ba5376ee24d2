use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;
use tokio::task;
use tracing::{info, warn};

use stockroom_auth::{
    hash_password, validate_password_strength, verify_password, NewUser, Role, TokenPair,
    TokenUse, User, UserPatch,
};
use stockroom_core::{DomainError, Entity, ExpectedVersion, UserId};
use stockroom_infra::{MailTemplate, RepositoryError};

use super::{insert, load, update, AppServices, ServiceResult};
use crate::app::errors::ServiceError;

/// Account creation request: profile plus the plaintext password.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: User,
}

async fn hash_blocking(password: String) -> ServiceResult<String> {
    let hashed = task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {e}")))??;
    Ok(hashed)
}

async fn verify_blocking(password: String, hash: String) -> ServiceResult<bool> {
    let ok = task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("password check task failed: {e}")))??;
    Ok(ok)
}

impl AppServices {
    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repos.users.find_all().await?)
    }

    pub async fn get_user(&self, id: UserId) -> ServiceResult<User> {
        load(self.repos.users.as_ref(), id).await
    }

    async fn find_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let username = username.trim().to_lowercase();
        let mut found = self
            .repos
            .users
            .find_by_field("username", &json!(username))
            .await?;
        Ok(found.pop())
    }

    pub async fn create_user(&self, input: CreateUser) -> ServiceResult<User> {
        validate_password_strength(&input.password)?;
        let password_hash = hash_blocking(input.password).await?;
        let user = User::create(
            NewUser {
                username: input.username,
                email: input.email,
                display_name: input.display_name,
                roles: input.roles,
            },
            password_hash,
            Utc::now(),
        )?;

        let user = {
            let _users = self.user_lock.lock().await;
            if self.find_user_by_username(user.username()).await?.is_some() {
                return Err(DomainError::conflict(format!(
                    "username '{}' is already taken",
                    user.username()
                ))
                .into());
            }
            insert(self.repos.users.as_ref(), user).await?
        };
        info!(user_id = %user.id(), username = user.username(), "user created");

        let roles = user
            .roles()
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let vars = BTreeMap::from([
            ("display_name", user.display_name().to_string()),
            ("username", user.username().to_string()),
            ("roles", roles),
        ]);
        self.send_mail(MailTemplate::WELCOME, user.email(), &vars).await;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        id: UserId,
        patch: UserPatch,
        expected: ExpectedVersion,
    ) -> ServiceResult<User> {
        let mut user = self.get_user(id).await?;
        expected.check(user.version())?;
        user.update_profile(patch, Utc::now())?;
        update(self.repos.users.as_ref(), user).await
    }

    pub async fn assign_role(
        &self,
        id: UserId,
        role: &str,
        expected: ExpectedVersion,
    ) -> ServiceResult<User> {
        let role = Role::parse_known(role)?;
        let mut user = self.get_user(id).await?;
        expected.check(user.version())?;
        user.assign_role(role.clone(), Utc::now())?;
        let user = update(self.repos.users.as_ref(), user).await?;
        info!(user_id = %id, role = role.as_str(), "role assigned");
        Ok(user)
    }

    pub async fn revoke_role(
        &self,
        actor: UserId,
        id: UserId,
        role: &str,
        expected: ExpectedVersion,
    ) -> ServiceResult<User> {
        let role = Role::new(role.trim().to_lowercase());
        let mut user = self.get_user(id).await?;
        expected.check(user.version())?;
        user.revoke_role(&role, actor, Utc::now())?;
        let user = update(self.repos.users.as_ref(), user).await?;
        info!(user_id = %id, role = role.as_str(), "role revoked");
        Ok(user)
    }

    pub async fn suspend_user(
        &self,
        actor: UserId,
        id: UserId,
        expected: ExpectedVersion,
    ) -> ServiceResult<User> {
        let mut user = self.get_user(id).await?;
        expected.check(user.version())?;
        user.suspend(actor, Utc::now())?;
        let user = update(self.repos.users.as_ref(), user).await?;
        info!(user_id = %id, actor = %actor, "user suspended");
        Ok(user)
    }

    pub async fn activate_user(&self, id: UserId, expected: ExpectedVersion) -> ServiceResult<User> {
        let mut user = self.get_user(id).await?;
        expected.check(user.version())?;
        user.activate(Utc::now())?;
        let user = update(self.repos.users.as_ref(), user).await?;
        info!(user_id = %id, "user activated");
        Ok(user)
    }

    pub async fn delete_user(
        &self,
        actor: UserId,
        id: UserId,
        expected: ExpectedVersion,
    ) -> ServiceResult<()> {
        if actor == id {
            return Err(DomainError::invariant("users cannot delete their own account").into());
        }
        expected.check(self.get_user(id).await?.version())?;
        if !self.repos.users.delete(id).await? {
            return Err(DomainError::not_found(User::KIND).into());
        }
        info!(user_id = %id, actor = %actor, "user deleted");
        Ok(())
    }

    /// Check credentials and issue a token pair. Every failure reads the same
    /// to the caller.
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let Some(mut user) = self.find_user_by_username(username).await? else {
            return Err(ServiceError::unauthenticated("invalid username or password"));
        };
        if !verify_blocking(password.to_string(), user.password_hash().to_string()).await? {
            return Err(ServiceError::unauthenticated("invalid username or password"));
        }
        if !user.can_authenticate() {
            return Err(ServiceError::unauthenticated("account is suspended"));
        }

        let now = Utc::now();
        user.record_login(now);
        let user = match update(self.repos.users.as_ref(), user.clone()).await {
            Ok(saved) => saved,
            Err(ServiceError::Repository(RepositoryError::Conflict(e))) => {
                warn!(user_id = %user.id(), error = %e, "last login not recorded");
                user
            }
            Err(e) => return Err(e),
        };

        let tokens = self.tokens.issue_pair(&user, now)?;
        info!(user_id = %user.id(), username = user.username(), "login succeeded");
        Ok(LoginOutcome { tokens, user })
    }

    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let now = Utc::now();
        let claims = self.tokens.validate(refresh_token, TokenUse::Refresh, now)?;
        let user = self.active_user(claims.sub).await?;
        Ok(self.tokens.issue_pair(&user, now)?)
    }

    /// Resolve an access token to its stored user. Roles come from the stored
    /// record, so suspensions and role changes apply to tokens already issued.
    pub async fn authenticate(&self, access_token: &str) -> ServiceResult<User> {
        let claims = self.tokens.validate(access_token, TokenUse::Access, Utc::now())?;
        self.active_user(claims.sub).await
    }

    async fn active_user(&self, id: UserId) -> ServiceResult<User> {
        match self.repos.users.find_by_id(id).await? {
            Some(user) if user.can_authenticate() => Ok(user),
            _ => Err(ServiceError::unauthenticated("user is no longer active")),
        }
    }

    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let mut user = self.get_user(user_id).await?;
        if !verify_blocking(current.to_string(), user.password_hash().to_string()).await? {
            return Err(ServiceError::unauthenticated("current password is incorrect"));
        }
        validate_password_strength(new_password)?;
        let hash = hash_blocking(new_password.to_string()).await?;
        user.set_password_hash(hash, Utc::now());
        update(self.repos.users.as_ref(), user).await?;
        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Create the configured admin account unless the username already exists.
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> ServiceResult<()> {
        if self.find_user_by_username(username).await?.is_some() {
            return Ok(());
        }
        let display_name = username.trim().to_string();
        let user = self
            .create_user(CreateUser {
                username: username.to_string(),
                email: format!("{}@stockroom.local", username.trim().to_lowercase()),
                display_name,
                password: password.to_string(),
                roles: vec![Role::ADMIN],
            })
            .await?;
        info!(user_id = %user.id(), username = user.username(), "bootstrap admin created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::services::{test_services, Repositories};

    fn clerk(email: &str) -> CreateUser {
        CreateUser {
            username: "Clerk".into(),
            email: email.into(),
            display_name: "Clerk".into(),
            password: "clerk-password".into(),
            roles: vec![Role::STAFF],
        }
    }

    #[tokio::test]
    async fn concurrent_creates_of_one_username_keep_a_single_account() {
        let services = Arc::new(test_services(Repositories::in_memory()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let services = Arc::clone(&services);
                tokio::spawn(async move { services.create_user(clerk(&format!("c{i}@example.com"))).await })
            })
            .collect();
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_)))),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(services.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_versions_are_refused_by_user_actions() {
        let services = test_services(Repositories::in_memory());
        let admin = services.create_user(clerk("admin@example.com")).await.unwrap();
        let target = services
            .create_user(CreateUser { username: "temp".into(), ..clerk("temp@example.com") })
            .await
            .unwrap();
        let stale = ExpectedVersion::Exact(target.version() + 1);

        let err = services.suspend_user(admin.id(), target.id(), stale).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        let err = services.assign_role(target.id(), "manager", stale).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        let err = services.delete_user(admin.id(), target.id(), stale).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        let current = ExpectedVersion::Exact(target.version());
        let suspended = services.suspend_user(admin.id(), target.id(), current).await.unwrap();
        assert!(!suspended.can_authenticate());
        let err = services
            .activate_user(target.id(), ExpectedVersion::Exact(target.version()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }
}
