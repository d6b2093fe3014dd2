pub mod error;
pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};
use murmur_core::AppState;

use crate::error::ApiError;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/polls/{id}", get(routes::polls::get_poll))
        .fallback(|| async { ApiError::NotFound })
}
