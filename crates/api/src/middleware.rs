use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use tracing::debug;

use stockroom_core::Entity;

use crate::app::errors::json_error;
use crate::app::AppServices;
use crate::context::PrincipalContext;

/// Require a valid access token for an active user and attach the caller's
/// `PrincipalContext`.
pub async fn auth_middleware(
    Extension(services): Extension<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Some(token) => token,
        None => {
            return json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "missing bearer token",
            );
        }
    };

    let user = match services.authenticate(token).await {
        Ok(user) => user,
        Err(e) => {
            debug!(error = %e, "rejected access token");
            return e.into_response();
        }
    };

    req.extensions_mut().insert(PrincipalContext::new(
        user.id(),
        user.username(),
        user.roles().to_vec(),
    ));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}
