use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};

use stockroom_core::{ExpectedVersion, UserId};

use crate::app::dto::{self, AssignRoleRequest, CreateUserRequest, UpdateUserRequest};
use crate::app::errors::ServiceError;
use crate::app::extract::{AppJson, AppPath, VersionBody};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/roles", post(assign_role))
        .route("/:id/roles/:role", delete(revoke_role))
        .route("/:id/suspend", post(suspend_user))
        .route("/:id/activate", post(activate_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.read")?;
    let users = services.list_users().await?;
    Ok(Json(dto::items(&users, dto::user_to_json)).into_response())
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.create")?;
    let user = services.create_user(body.into()).await?;
    Ok((StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.read")?;
    let id: UserId = id.parse()?;
    let user = services.get_user(id).await?;
    Ok(Json(dto::user_to_json(&user)).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<UpdateUserRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.update")?;
    let id: UserId = id.parse()?;
    let expected = ExpectedVersion::from_option(body.expected_version);
    let user = services.update_user(id, body.patch, expected).await?;
    Ok(Json(dto::user_to_json(&user)).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.delete")?;
    let id: UserId = id.parse()?;
    services.delete_user(principal.user_id(), id, expected).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<AssignRoleRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.update")?;
    let id: UserId = id.parse()?;
    let expected = ExpectedVersion::from_option(body.expected_version);
    let user = services.assign_role(id, &body.role, expected).await?;
    Ok(Json(dto::user_to_json(&user)).into_response())
}

pub async fn revoke_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath((id, role)): AppPath<(String, String)>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.update")?;
    let id: UserId = id.parse()?;
    let user = services.revoke_role(principal.user_id(), id, &role, expected).await?;
    Ok(Json(dto::user_to_json(&user)).into_response())
}

pub async fn suspend_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.update")?;
    let id: UserId = id.parse()?;
    let user = services.suspend_user(principal.user_id(), id, expected).await?;
    Ok(Json(dto::user_to_json(&user)).into_response())
}

pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "users.update")?;
    let id: UserId = id.parse()?;
    let user = services.activate_user(id, expected).await?;
    Ok(Json(dto::user_to_json(&user)).into_response())
}
