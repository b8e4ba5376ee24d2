//! Extractors whose rejections use the `{"error","message"}` body.
//!
//! axum's own `Json`, `Query` and `Path` answer malformed input with a
//! `text/plain` body; these wrappers turn the rejection into a `ServiceError`.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use stockroom_core::ExpectedVersion;

use crate::app::dto::VersionRequest;
use crate::app::errors::ServiceError;

/// JSON request body.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string.
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters.
pub struct AppPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Optional `{"expected_version": n}` body of action and delete routes.
///
/// An empty body means any version. A body that is present must parse,
/// whatever its content type.
pub struct VersionBody(pub ExpectedVersion);

#[async_trait]
impl<S> FromRequest<S> for VersionBody
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        parse_version_body(&bytes).map(Self)
    }
}

fn parse_version_body(bytes: &[u8]) -> Result<ExpectedVersion, ServiceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExpectedVersion::Any);
    }
    let body: VersionRequest = serde_json::from_slice(bytes).map_err(|e| {
        ServiceError::rejected(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"))
    })?;
    Ok(body.expected())
}
