// src/error.rs

use axum::http::StatusCode as AxumStatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::dispatch::DispatchError;
use crate::report::ReportError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Row store error: {0}")]
    Store(#[from] StoreError),
    #[error("Report rendering error: {0}")]
    Report(#[from] ReportError),
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

// Every domain error is handled at the boundary where it occurs and turned
// into a JSON body the client can show as a dismissible notification. The
// original error always lands in the log; sanitized text goes to the user.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Error occurred: {}", self);

        let (status_code, error_message) = match &self {
            AppError::MissingEnvVar(_) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error.".to_string(),
            ),
            AppError::Validation(message) => {
                (AxumStatusCode::UNPROCESSABLE_ENTITY, message.clone())
            }
            AppError::Store(StoreError::Request(_)) => (
                AxumStatusCode::BAD_GATEWAY,
                "Failed to reach the row store.".to_string(),
            ),
            AppError::Store(StoreError::ApiError { status, message }) => {
                let axum_status = AxumStatusCode::from_u16(status.as_u16())
                    .unwrap_or(AxumStatusCode::INTERNAL_SERVER_ERROR);
                error!(
                    "Row store error details: Status: {}, Message: {:?}",
                    status, message
                );
                (
                    axum_status,
                    format!(
                        "Row store request failed (status {}). Details logged.",
                        status.as_u16()
                    ),
                )
            }
            AppError::Store(_) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error (row store).".to_string(),
            ),
            AppError::Report(_) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Failed to render the report.".to_string(),
            ),
            AppError::Dispatch(DispatchError::InvalidRecipient(address)) => (
                AxumStatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid recipient address: {}", address),
            ),
            AppError::Dispatch(DispatchError::NoRecipients) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "No report recipients configured.".to_string(),
            ),
            AppError::Dispatch(e) => (AxumStatusCode::BAD_GATEWAY, e.to_string()),
        };

        (status_code, Json(json!({ "error": error_message }))).into_response()
    }
}
