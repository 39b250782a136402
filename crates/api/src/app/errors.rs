use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use releasehub_auth::AuthzError;
use releasehub_core::DomainError;
use releasehub_infra::StoreError;

/// Every way a release request can fail, mapped to a status code in one place.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User is not logged in")]
    Unauthenticated,

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// The record failed model validation before reaching the store.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Malformed request body or path.
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid Release id {0}")]
    InvalidId(String),

    #[error("Failed to load Release {0}")]
    ReleaseNotFound(String),

    /// Validation or store failure while creating/updating/deleting/listing.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Store failure while resolving `:release_id`.
    #[error("failed to load release: {0}")]
    Lookup(StoreError),

    #[error("{0}")]
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated => json_error(StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden(e) => (StatusCode::FORBIDDEN, e.to_string()).into_response(),
            ApiError::Validation(e) => json_error(StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, msg),
            ApiError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::ReleaseNotFound(_) => json_error(StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Store(StoreError::NotFound) => {
                json_error(StatusCode::NOT_FOUND, StoreError::NotFound.client_message())
            }
            ApiError::Store(e) => {
                if let StoreError::Backend(detail) = &e {
                    tracing::error!(error = %detail, "release store failure");
                }
                json_error(StatusCode::BAD_REQUEST, e.client_message())
            }
            ApiError::Lookup(e) => {
                tracing::error!(error = %e, "release lookup failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, e.client_message())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = msg, "internal error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "message": message.into(),
        })),
    )
        .into_response()
}
