//! Error types for media-relay
//!
//! This module provides error handling for the whole crate:
//! - Typed failure taxonomy for the fetch pipeline and the upload step
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-relay
///
/// Variants map onto the failure taxonomy of the relay pipeline: request
/// validation, transient download failures, content validation, the
/// terminal retries-exhausted wrapper, and upload failures from the
/// messaging platform.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "TG_BOT_TOKEN")
        key: Option<String>,
    },

    /// Invalid request input (malformed/non-HTTP URL, missing fields).
    /// Never retried and surfaced as a client error.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (scratch file creation, streamed write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The media host answered with a non-success status
    #[error("unexpected HTTP status {status} from media host")]
    HttpStatus {
        /// The status code the host returned
        status: u16,
    },

    /// The response body's declared type matches no accepted media category.
    /// Carries a small body sample so an HTML error page served with a 200
    /// can be diagnosed from the error alone.
    #[error("wrong content type {content_type:?}: {snippet}")]
    ContentMismatch {
        /// The `content-type` header the host returned
        content_type: String,
        /// Up to the first 512 bytes of the body, lossily decoded
        snippet: String,
    },

    /// Terminal download failure after the attempt budget was spent
    #[error("download failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts performed (initial + retries)
        attempts: u32,
        /// The last underlying attempt error
        #[source]
        source: Box<Error>,
    },

    /// The messaging platform rejected or failed the upload
    #[error("upload failed: {0}")]
    Upload(String),

    /// The caller cancelled the fetch; the partial file is already removed
    #[error("fetch cancelled")]
    Cancelled,

    /// Shutdown in progress - not accepting new uploads
    #[error("shutdown in progress: not accepting new uploads")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),
}

/// API error response format
///
/// Returned by API endpoints when a request fails. Follows a standard
/// format with machine-readable error codes, human-readable messages, and
/// optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "content_mismatch",
///     "message": "wrong content type \"text/html\": <html>...",
///     "details": {
///       "content_type": "text/html"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// The inbound contract is deliberately narrow: validation failures are
/// client errors (400), shutdown is 503, and every delivery failure is
/// reported as 500 with the typed envelope carrying the specifics.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Validation(_) => 400,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error - everything that failed past
            // request validation (download, upload, local I/O)
            Error::Config { .. } => 500,
            Error::Network(_) => 500,
            Error::Io(_) => 500,
            Error::HttpStatus { .. } => 500,
            Error::ContentMismatch { .. } => 500,
            Error::RetriesExhausted { .. } => 500,
            Error::Upload(_) => 500,
            Error::Cancelled => 500,
            Error::Serialization(_) => 500,
            Error::ApiServer(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::HttpStatus { .. } => "upstream_status",
            Error::ContentMismatch { .. } => "content_mismatch",
            Error::RetriesExhausted { .. } => "download_failed",
            Error::Upload(_) => "upload_error",
            Error::Cancelled => "cancelled",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServer(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::HttpStatus { status } => Some(serde_json::json!({
                "status": status,
            })),
            Error::ContentMismatch {
                content_type,
                snippet,
            } => Some(serde_json::json!({
                "content_type": content_type,
                "snippet": snippet,
            })),
            Error::RetriesExhausted { attempts, source } => {
                // Surface the last attempt's mismatch sample if there was one
                let mut ctx = serde_json::json!({
                    "attempts": attempts,
                    "cause": source.error_code(),
                });
                if let Error::ContentMismatch {
                    content_type,
                    snippet,
                } = source.as_ref()
                {
                    ctx["content_type"] = serde_json::json!(content_type);
                    ctx["snippet"] = serde_json::json!(snippet);
                }
                Some(ctx)
            }
            Error::Config { key, .. } => key.as_ref().map(|k| {
                serde_json::json!({
                    "key": k,
                })
            }),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
