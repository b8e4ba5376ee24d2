use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use stockroom_core::{CustomerId, ExpectedVersion};
use stockroom_parties::NewCustomer;

use crate::app::dto::{self, UpdateCustomerRequest};
use crate::app::errors::ServiceError;
use crate::app::extract::{AppJson, AppPath, VersionBody};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/:id/sales", get(customer_sales))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "customers.read")?;
    let customers = services.list_customers().await?;
    Ok(Json(dto::items(&customers, dto::customer_to_json)).into_response())
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewCustomer>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "customers.create")?;
    let customer = services.create_customer(body).await?;
    Ok((StatusCode::CREATED, Json(dto::customer_to_json(&customer))).into_response())
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "customers.read")?;
    let id: CustomerId = id.parse()?;
    let customer = services.get_customer(id).await?;
    Ok(Json(dto::customer_to_json(&customer)).into_response())
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<UpdateCustomerRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "customers.update")?;
    let id: CustomerId = id.parse()?;
    let expected = ExpectedVersion::from_option(body.expected_version);
    let customer = services.update_customer(id, body.patch, expected).await?;
    Ok(Json(dto::customer_to_json(&customer)).into_response())
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "customers.delete")?;
    let id: CustomerId = id.parse()?;
    services.delete_customer(id, expected).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn customer_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "sales.read")?;
    let id: CustomerId = id.parse()?;
    let sales = services.customer_sales(id).await?;
    Ok(Json(dto::items(&sales, dto::sale_to_json)).into_response())
}
