use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use stockroom_core::{ExpectedVersion, SupplierId};
use stockroom_parties::NewSupplier;

use crate::app::dto::{self, UpdateSupplierRequest};
use crate::app::errors::ServiceError;
use crate::app::extract::{AppJson, AppPath, VersionBody};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/:id/purchases", get(supplier_purchases))
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "suppliers.read")?;
    let suppliers = services.list_suppliers().await?;
    Ok(Json(dto::items(&suppliers, dto::supplier_to_json)).into_response())
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewSupplier>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "suppliers.create")?;
    let supplier = services.create_supplier(body).await?;
    Ok((StatusCode::CREATED, Json(dto::supplier_to_json(&supplier))).into_response())
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "suppliers.read")?;
    let id: SupplierId = id.parse()?;
    let supplier = services.get_supplier(id).await?;
    Ok(Json(dto::supplier_to_json(&supplier)).into_response())
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<UpdateSupplierRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "suppliers.update")?;
    let id: SupplierId = id.parse()?;
    let expected = ExpectedVersion::from_option(body.expected_version);
    let supplier = services.update_supplier(id, body.patch, expected).await?;
    Ok(Json(dto::supplier_to_json(&supplier)).into_response())
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "suppliers.delete")?;
    let id: SupplierId = id.parse()?;
    services.delete_supplier(id, expected).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn supplier_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "purchases.read")?;
    let id: SupplierId = id.parse()?;
    let orders = services.supplier_purchases(id).await?;
    Ok(Json(dto::items(&orders, dto::purchase_order_to_json)).into_response())
}
