use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::notify::Notice;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(Notice),

    #[error("{0}")]
    Forbidden(Notice),

    #[error("{0}")]
    Conflict(Notice),

    #[error("Not found")]
    NotFound,

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(notice) => (StatusCode::BAD_REQUEST, notice.to_string()),
            AppError::Forbidden(notice) => (StatusCode::FORBIDDEN, notice.to_string()),
            AppError::Conflict(notice) => (StatusCode::CONFLICT, notice.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Identity(msg) => {
                error!("identity provider error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Identity provider error".to_string())
            }
            AppError::Store(msg) => {
                error!("document store error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Document store error".to_string())
            }
            AppError::Http(e) => {
                error!("http error: {}", e);
                (StatusCode::BAD_GATEWAY, "Upstream request failed".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
