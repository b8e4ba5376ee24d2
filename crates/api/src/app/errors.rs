//! Error type shared by services and the mapping to JSON error responses.

use axum::extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use stockroom_auth::{AuthzError, PasswordError, TokenError};
use stockroom_core::DomainError;
use stockroom_infra::{RepositoryError, StorageError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Bad credentials, suspended account, unusable refresh token.
    #[error("{0}")]
    Unauthenticated(String),

    /// The request could not be extracted: malformed JSON, query or path.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::Domain(e) => match e {
                DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                DomainError::InvariantViolation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation")
                }
                DomainError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            },
            ServiceError::Repository(RepositoryError::Conflict(_)) => {
                (StatusCode::CONFLICT, "conflict")
            }
            ServiceError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ServiceError::Storage(e) => match e {
                StorageError::UnsupportedContentType(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
                }
                StorageError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
                StorageError::Empty | StorageError::InvalidKey(_) => {
                    (StatusCode::BAD_REQUEST, "validation_error")
                }
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                StorageError::Io(_) | StorageError::Backend(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
                }
            },
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ServiceError::Token(e) => match e {
                TokenError::KeyFile { .. } | TokenError::Key(_) | TokenError::Signing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "token_error")
                }
                _ => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            },
            ServiceError::Password(_) | ServiceError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            ServiceError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ServiceError::Rejected { status, .. } => match *status {
                StatusCode::PAYLOAD_TOO_LARGE => (*status, "payload_too_large"),
                StatusCode::UNSUPPORTED_MEDIA_TYPE => (*status, "unsupported_media_type"),
                _ => (StatusCode::BAD_REQUEST, "validation_error"),
            },
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, code, "request failed");
            return json_error(status, code, "internal server error");
        }
        json_error(status, code, self.to_string())
    }
}

macro_rules! rejection_into_service_error {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ServiceError {
                fn from(rejection: $rejection) -> Self {
                    Self::rejected(rejection.status(), rejection.body_text())
                }
            }
        )+
    };
}

rejection_into_service_error!(JsonRejection, QueryRejection, PathRejection, BytesRejection);

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<ServiceError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        assert_eq!(status(DomainError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(DomainError::invalid_id("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(DomainError::not_found("customer")), StatusCode::NOT_FOUND);
        assert_eq!(status(DomainError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status(DomainError::invariant("x")), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn infrastructure_errors_map_to_statuses() {
        assert_eq!(status(RepositoryError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(RepositoryError::Backend("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(StorageError::TooLarge { size: 2, max: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(status(AuthzError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(TokenError::Expired), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rejections_keep_their_client_status() {
        assert_eq!(
            status(ServiceError::rejected(StatusCode::BAD_REQUEST, "bad json")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ServiceError::rejected(StatusCode::UNPROCESSABLE_ENTITY, "wrong shape")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ServiceError::rejected(StatusCode::UNSUPPORTED_MEDIA_TYPE, "no content type")),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
