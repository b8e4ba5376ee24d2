use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::app::dto::{self, ChangePasswordRequest, LoginRequest, RefreshRequest};
use crate::app::errors::ServiceError;
use crate::app::extract::AppJson;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Token acquisition (public).
pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Response, ServiceError> {
    let outcome = services.login(&body.username, &body.password).await?;
    let mut payload = dto::token_pair_to_json(&outcome.tokens);
    payload["user"] = dto::user_to_json(&outcome.user);
    Ok(Json(payload).into_response())
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    AppJson(body): AppJson<RefreshRequest>,
) -> Result<Response, ServiceError> {
    let pair = services.refresh(&body.refresh_token).await?;
    Ok(Json(dto::token_pair_to_json(&pair)).into_response())
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> Result<Response, ServiceError> {
    services
        .change_password(principal.user_id(), &body.current_password, &body.new_password)
        .await?;
    Ok((StatusCode::OK, Json(json!({ "status": "password changed" }))).into_response())
}
