use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use stockroom_core::SaleId;
use stockroom_sales::SaleStatus;

use crate::app::dto::{self, CreateSaleRequest, StatusQuery};
use crate::app::errors::ServiceError;
use crate::app::extract::{AppJson, AppPath, AppQuery, VersionBody};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale))
        .route("/:id/confirm", post(confirm_sale))
        .route("/:id/cancel", post(cancel_sale))
}

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<StatusQuery>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "sales.read")?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<SaleStatus>)
        .transpose()?;
    let sales = services.list_sales(status).await?;
    Ok(Json(dto::items(&sales, dto::sale_to_json)).into_response())
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<CreateSaleRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "sales.create")?;
    let sale = services.create_sale(body.into()).await?;
    Ok((StatusCode::CREATED, Json(dto::sale_to_json(&sale))).into_response())
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "sales.read")?;
    let id: SaleId = id.parse()?;
    let sale = services.get_sale(id).await?;
    Ok(Json(dto::sale_to_json(&sale)).into_response())
}

pub async fn confirm_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "sales.update")?;
    let id: SaleId = id.parse()?;
    let sale = services.confirm_sale(id, expected).await?;
    Ok(Json(dto::sale_to_json(&sale)).into_response())
}

pub async fn cancel_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "sales.update")?;
    let id: SaleId = id.parse()?;
    let sale = services.cancel_sale(id, expected).await?;
    Ok(Json(dto::sale_to_json(&sale)).into_response())
}
