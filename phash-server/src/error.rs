//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use phash_core::PhashError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, empty, disallowed or oversized input, detected before any decode
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network, URL or non-success HTTP status while fetching a remote image
    #[error("Download error: {0}")]
    Download(String),

    /// Error from the hashing library
    #[error("{0}")]
    Core(#[from] PhashError),

    /// Anything else; never shown to the client verbatim
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a download error
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Download(_) => StatusCode::BAD_REQUEST,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(ref e) => match e {
                // Client-provided hash text → 400
                PhashError::Format(_) | PhashError::InputMismatch { .. } => {
                    StatusCode::BAD_REQUEST
                }

                // Undecodable content and misconfiguration → 500
                PhashError::Decode(_) | PhashError::InvalidConfig(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_INPUT",
            Self::Download(_) => "DOWNLOAD_ERROR",
            Self::Unexpected(_) => "INTERNAL_ERROR",
            Self::Core(ref e) => match e {
                PhashError::Decode(_) => "DECODE_ERROR",
                PhashError::Format(_) => "INVALID_HASH",
                PhashError::InputMismatch { .. } => "HASH_LENGTH_MISMATCH",
                PhashError::InvalidConfig(_) => "INTERNAL_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    ///
    /// Server-side failures get a fixed message; the detail only goes to the log.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Download(msg) => msg.clone(),
            Self::Unexpected(_) => "Internal server error".to_string(),
            Self::Core(ref e) => match e {
                PhashError::Decode(_) => "Failed to process image".to_string(),
                PhashError::InvalidConfig(_) => "Internal server error".to_string(),
                PhashError::Format(_) | PhashError::InputMismatch { .. } => e.to_string(),
            },
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Download(_) => "download",
            Self::Core(_) => "phash",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Unexpected(format!("Pipeline task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error (internal details logged)"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::download("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::unexpected("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PhashError::Decode("bad".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PhashError::Format("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PhashError::InputMismatch { left: 64, right: 16 }).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors_do_not_leak_detail() {
        let err = ApiError::from(PhashError::Decode(
            "Failed to decode Png image: /tmp/secret path".into(),
        ));
        assert_eq!(err.client_message(), "Failed to process image");

        let err = ApiError::unexpected("connection pool exploded at 0xdeadbeef");
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_errors_keep_message() {
        assert_eq!(
            ApiError::validation("Invalid file type").client_message(),
            "Invalid file type"
        );
        let err = ApiError::from(PhashError::Format("invalid hexadecimal value 'zz'".into()));
        assert!(err.client_message().contains("invalid hexadecimal value"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::validation("x").error_code(), "INVALID_INPUT");
        assert_eq!(ApiError::download("x").error_code(), "DOWNLOAD_ERROR");
        assert_eq!(
            ApiError::from(PhashError::Decode("x".into())).error_code(),
            "DECODE_ERROR"
        );
    }
}
