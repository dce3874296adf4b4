use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Internal server error")]
    Internal,
    #[error("File not found")]
    NotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Please choose a PDF file to upload")]
    MissingFile,
    #[error("Only PDF files are accepted (got {0})")]
    UnsupportedMediaType(String),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::MissingFile | ApiError::UnsupportedMediaType(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal | ApiError::PayloadTooLarge { .. } | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // server-side failures carry no detail to the client
        let body = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::UnsupportedMediaType(_) => "Only PDF files are accepted".to_string(),
            ApiError::Internal | ApiError::PayloadTooLarge { .. } | ApiError::Storage(_) => {
                tracing::error!(error = %self, "request failed");
                ApiError::Internal.to_string()
            }
            _ => self.to_string(),
        };

        if status.is_client_error() {
            tracing::warn!(%status, error = %self, "request rejected");
        }

        (status, body).into_response()
    }
}
