use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Extension},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};

use stockroom_core::{DomainError, ExpectedVersion, ProductId};
use stockroom_infra::storage::MAX_IMAGE_BYTES;
use stockroom_products::NewProduct;

use crate::app::dto::{self, ProductQuery, UpdateProductRequest, VersionRequest};
use crate::app::errors::ServiceError;
use crate::app::extract::{AppJson, AppPath, AppQuery, VersionBody};
use crate::app::services::{AppServices, ProductFilter};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/:id/image",
            put(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1024)),
        )
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "products.read")?;
    let filter = ProductFilter {
        low_stock: query.low_stock.unwrap_or(false),
        category: query.category,
    };
    let products = services.list_products(&filter).await?;
    Ok(Json(dto::items(&products, dto::product_to_json)).into_response())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewProduct>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "products.create")?;
    let product = services.create_product(body).await?;
    Ok((StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response())
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "products.read")?;
    let id: ProductId = id.parse()?;
    let product = services.get_product(id).await?;
    Ok(Json(dto::product_to_json(&product)).into_response())
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<UpdateProductRequest>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "products.update")?;
    let id: ProductId = id.parse()?;
    let expected = ExpectedVersion::from_option(body.expected_version);
    let product = services.update_product(id, body.patch, expected).await?;
    Ok(Json(dto::product_to_json(&product)).into_response())
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    VersionBody(expected): VersionBody,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "products.delete")?;
    let id: ProductId = id.parse()?;
    services.delete_product(id, expected).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Raw image body; `?expected_version=` guards against concurrent edits.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<String>,
    AppQuery(version): AppQuery<VersionRequest>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServiceError> {
    authz::require(&principal, "products.update")?;
    let id: ProductId = id.parse()?;
    let body = body?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DomainError::validation("missing Content-Type header"))?;
    let product = services
        .upload_product_image(id, content_type, body.to_vec(), version.expected())
        .await?;
    Ok(Json(dto::product_to_json(&product)).into_response())
}
