use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::validation::ValidationError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Todo not found")]
    NotFound,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("{message}: {source}")]
    Storage {
        message: &'static str,
        #[source]
        source: StorageError,
    },
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn storage(message: &'static str, source: StorageError) -> Self {
        tracing::error!(error = %source, "{message}");
        AppError::Storage { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), details: None }
    }
}

/// Internal cause of a 500, carried in response extensions so that the
/// development-mode layer can expose it. Never serialized by default.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(err) if err.is_schema_failure() => (
                status,
                Json(ErrorBody {
                    error: "Validation failed".into(),
                    details: Some(vec![err.to_string()]),
                }),
            )
                .into_response(),
            AppError::Validation(err) => {
                (status, Json(ErrorBody::new(err.to_string()))).into_response()
            }
            AppError::NotFound => (status, Json(ErrorBody::new("Todo not found"))).into_response(),
            AppError::PayloadTooLarge => {
                (status, Json(ErrorBody::new("Request body too large"))).into_response()
            }
            AppError::Storage { message, source } => {
                let mut response = (status, Json(ErrorBody::new(message))).into_response();
                response.extensions_mut().insert(InternalDetail(source.to_string()));
                response
            }
            AppError::Internal(detail) => {
                let mut response =
                    (status, Json(ErrorBody::new("Internal server error"))).into_response();
                response.extensions_mut().insert(InternalDetail(detail));
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(
            AppError::from(ValidationError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let storage = AppError::storage(
            "Failed to fetch todos",
            StorageError::Corrupt("bad row".into()),
        );
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_errors_keep_detail_out_of_the_body() {
        let response = AppError::storage(
            "Failed to create todo",
            StorageError::Corrupt("disk on fire".into()),
        )
        .into_response();
        let detail = response.extensions().get::<InternalDetail>().cloned();
        assert_eq!(detail.map(|d| d.0), Some("Corrupt record: disk on fire".to_string()));
    }
}
