//! Error types for the PDF measurement API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfmeasure_core::MeasureError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No PDF loaded")]
    NoDocument,

    #[error("Page {page} out of bounds (total: {total})")]
    PageNotFound { page: i64, total: u32 },

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MeasureError> for ApiError {
    fn from(err: MeasureError) -> Self {
        match err {
            MeasureError::InvalidPdf(msg) => ApiError::InvalidPdf(msg),
            MeasureError::PageOutOfBounds { page, total } => ApiError::PageNotFound { page, total },
            MeasureError::InvalidPageBox(msg) => ApiError::InvalidPdf(msg),
            MeasureError::InvalidCoordinates(msg) => ApiError::InvalidRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NoDocument => (StatusCode::BAD_REQUEST, "No PDF loaded".to_string()),
            ApiError::PageNotFound { page, total } => (
                StatusCode::NOT_FOUND,
                format!("Page {} out of bounds (total: {})", page, total),
            ),
            ApiError::InvalidPdf(msg) => {
                tracing::warn!("Rejected PDF: {}", msg);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Invalid PDF: {}", msg),
                )
            }
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
