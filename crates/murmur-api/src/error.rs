use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Record not found")]
    NotFound,
    #[error("The access token is invalid")]
    Unauthorized,
    #[error("This action is outside the authorized scopes")]
    OutsideScopes,
    #[error("Your login is currently disabled")]
    Forbidden,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Machine-readable error code string.
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::OutsideScopes => "OUTSIDE_SCOPES",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::OutsideScopes | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!("API internal error: {err:#}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "code": code,
            "message": message,
            // Clients of the REST API read the "error" field
            "error": message,
            "details": Value::Null,
        });

        (status, Json(body)).into_response()
    }
}

impl From<murmur_core::error::CoreError> for ApiError {
    fn from(e: murmur_core::error::CoreError) -> Self {
        match e {
            murmur_core::error::CoreError::NotFound => ApiError::NotFound,
            murmur_core::error::CoreError::Database(err) => ApiError::from(err),
        }
    }
}

impl From<murmur_db::DbError> for ApiError {
    fn from(e: murmur_db::DbError) -> Self {
        match e {
            murmur_db::DbError::NotFound => ApiError::NotFound,
            other => ApiError::Internal(anyhow::anyhow!("database error: {other}")),
        }
    }
}
