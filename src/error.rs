use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("ADMIN_PASSWORD is not set on the server.")]
    MissingSecret,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Status a store failure answers with. Client-caused failures are 4xx.
pub(crate) fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            AppError::Validation(message) | AppError::BadRequest(message) => {
                failure(StatusCode::BAD_REQUEST, &message)
            }
            AppError::MissingSecret => {
                tracing::error!("login attempted but ADMIN_PASSWORD is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "ADMIN_PASSWORD is not set on the server." })),
                )
                    .into_response()
            }
            AppError::Store(e) => {
                let status = store_status(&e);
                match e {
                    StoreError::Invalid(message) => failure(status, message),
                    StoreError::NotFound(id) => failure(status, &format!("Visitor {id} not found")),
                    StoreError::Conflict(id) => {
                        tracing::warn!(id, "rejected duplicate visitor id");
                        failure(status, &format!("Visitor {id} already exists"))
                    }
                    e => {
                        tracing::error!("Store error: {e}");
                        failure(status, "Backing store request failed")
                    }
                }
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {e}");
                failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                failure(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.")
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {rejection}");
        AppError::BadRequest("Invalid request data".to_string())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!("rejected form body: {rejection}");
        AppError::BadRequest("Invalid request data".to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {rejection}");
        AppError::BadRequest("Invalid request".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        let cases = [
            (AppError::Unauthorized("Unauthorized - No session"), StatusCode::UNAUTHORIZED),
            (AppError::Validation("Name is required".into()), StatusCode::BAD_REQUEST),
            (AppError::MissingSecret, StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Store(StoreError::Invalid("Visitor ID is required")), StatusCode::BAD_REQUEST),
            (AppError::Store(StoreError::NotFound("9".into())), StatusCode::NOT_FOUND),
            (AppError::Store(StoreError::Conflict("9".into())), StatusCode::CONFLICT),
            (
                AppError::Store(StoreError::Parse("not json".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
