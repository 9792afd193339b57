//! Application error types and handling.
//!
//! Provides structured error responses for the API.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `false`; mirrors the `success` flag of successful envelopes.
    pub success: bool,
    /// Error type/code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Media file not found in any of the probed locations.
    #[error("File not found: {name}")]
    FileNotFound {
        name: String,
        searched: Vec<String>,
    },

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload exceeded the configured size limit.
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Create a not found error for a shayari entry.
    pub fn shayari_not_found(id: &str) -> Self {
        Self::NotFound(format!("Shayari with ID {} not found", id))
    }

    /// Create a not found error for a music track.
    pub fn track_not_found(id: &str) -> Self {
        Self::NotFound(format!("Track with ID {} not found", id))
    }

    /// Create a validation error for path traversal attempt.
    pub fn path_traversal() -> Self {
        Self::BadRequest("Invalid path: path traversal not allowed".to_string())
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::FileNotFound { searched, .. } => {
                Some(serde_json::json!({ "paths": searched }))
            }
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Io(_) | Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut error_response = ErrorResponse::new(self.error_code(), self.to_string());
        if let Some(details) = self.details() {
            error_response = error_response.with_details(details);
        }

        if status.is_server_error() {
            tracing::error!(
                error_code = %self.error_code(),
                status = %status.as_u16(),
                message = %self,
                "API error"
            );
        } else {
            tracing::warn!(
                error_code = %self.error_code(),
                status = %status.as_u16(),
                message = %self,
                "API request rejected"
            );
        }

        HttpResponse::build(status).json(error_response)
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for converting Option to AppResult.
pub trait OptionExt<T> {
    /// Convert None to NotFound error.
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}
