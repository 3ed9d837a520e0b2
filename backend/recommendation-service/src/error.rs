use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::models::{EngineName, ItemId};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("game {0} not found")]
    NotFound(ItemId),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Engine {engine} failed: {reason}")]
    AdapterFailure { engine: EngineName, reason: String },

    #[error("Engine {engine} timed out after {timeout_ms}ms")]
    AdapterTimeout { engine: EngineName, timeout_ms: u64 },

    #[error("Recorder I/O error: {0}")]
    RecorderIo(String),

    #[error("Model loading error: {0}")]
    ModelLoadError(String),

    #[error("Catalog loading error: {0}")]
    CatalogLoadError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl AppError {
    /// Whether the failure originated in a scorer rather than in the request.
    pub fn is_adapter_failure(&self) -> bool {
        matches!(
            self,
            AppError::AdapterFailure { .. } | AppError::AdapterTimeout { .. }
        )
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AdapterFailure { .. } => StatusCode::BAD_GATEWAY,
            AppError::AdapterTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::CatalogLoadError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
