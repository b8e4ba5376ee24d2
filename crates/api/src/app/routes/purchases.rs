use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use stockroom_core::PurchaseOrderId;
use stockroom_purchasing::{NewPurchaseOrder, PurchaseOrderStatus};

use crate::app::dto::{self, StatusQuery};
use crate::app::errors::ServiceError;
use crate::app::extract::{AppJson, AppPath, AppQuery, VersionBody};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/:id", get(get_purchase))
        .route("/:id/receive", post(receive_purchase))
        .route("/:id/cancel", post(cancel_purchase))
}

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<StatusQuery>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "purchases.read")?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<PurchaseOrderStatus>)
        .transpose()?;
    let orders = services.list_purchases(status).await?;
    Ok(Json(dto::items(&orders, dto::purchase_order_to_json)).into_response())
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewPurchaseOrder>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "purchases.create")?;
    let order = services.create_purchase(body).await?;
    Ok((StatusCode::CREATED, Json(dto::purchase_order_to_json(&order))).into_response())
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "purchases.read")?;
    let id: PurchaseOrderId = id.parse()?;
    let order = services.get_purchase(id).await?;
    Ok(Json(dto::purchase_order_to_json(&order)).into_response())
}

pub async fn receive_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "purchases.update")?;
    let id: PurchaseOrderId = id.parse()?;
    let order = services.receive_purchase(id, expected).await?;
    Ok(Json(dto::purchase_order_to_json(&order)).into_response())
}

pub async fn cancel_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "purchases.update")?;
    let id: PurchaseOrderId = id.parse()?;
    let order = services.cancel_purchase(id, expected).await?;
    Ok(Json(dto::purchase_order_to_json(&order)).into_response())
}
