use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::app::errors::ServiceError;
use crate::app::extract::AppPath;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "stockroom",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/auth/login, /auth/refresh (public)",
            "uploads": "/uploads/*key (public)",
            "whoami": "/whoami",
            "me": "/me/password",
            "customers": "/customers[/:id[/sales]]",
            "suppliers": "/suppliers[/:id[/purchases]]",
            "products": "/products[/:id[/image]]",
            "purchases": "/purchases[/:id[/receive|/cancel]]",
            "sales": "/sales[/:id[/confirm|/cancel]]",
            "users": "/users[/:id[/roles|/suspend|/activate]]",
            "reports": "/reports/dashboard, /reports/monthly, /reports/yearly, /reports/top-products",
        }
    }))
}

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let now = Utc::now();
    let storage = services.storage_backend();
    match services.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "storage": storage, "timestamp": now })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "storage": storage,
                "timestamp": now,
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<Value> {
    let permissions = principal
        .to_principal()
        .permissions
        .iter()
        .map(|p| p.as_str().to_string())
        .collect::<Vec<_>>();
    Json(json!({
        "user_id": principal.user_id().to_string(),
        "username": principal.username(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "permissions": permissions,
    }))
}

/// Serve a stored upload (product images).
pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    AppPath(key): AppPath<String>,
) -> Result<Response, ServiceError> {
    let blob = services.store().get(&key).await?;
    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes).into_response())
}
