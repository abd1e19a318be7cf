use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use braid_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Store(StoreError::ThreadNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("thread not found: {id}"))
            }
            ApiError::Store(StoreError::ItemNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("thread item not found: {id}"))
            }
            ApiError::Store(StoreError::NotInBranchGroup { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Store(error) => {
                tracing::error!("store error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
            ApiError::Internal(error) => {
                tracing::error!("internal error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
