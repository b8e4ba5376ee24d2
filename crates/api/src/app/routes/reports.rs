use std::sync::Arc;

use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::app::dto::{TopProductsQuery, YearQuery};
use crate::app::errors::ServiceError;
use crate::app::extract::AppQuery;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/monthly", get(monthly))
        .route("/yearly", get(yearly))
        .route("/top-products", get(top_products))
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "reports.read")?;
    Ok(Json(services.dashboard().await?).into_response())
}

pub async fn monthly(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<YearQuery>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "reports.read")?;
    Ok(Json(services.monthly_report(query.year).await?).into_response())
}

pub async fn yearly(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "reports.read")?;
    let years = services.yearly_overview().await?;
    Ok(Json(json!({ "items": years })).into_response())
}

pub async fn top_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<TopProductsQuery>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "reports.read")?;
    let items = services
        .top_products(query.year, query.month, query.limit)
        .await?;
    Ok(Json(json!({ "items": items })).into_response())
}
