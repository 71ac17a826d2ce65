//! Error types for Cloud Foundry management operations.
//!
//! A single error enum is shared by the Cloud Controller and LDAP clients. Transport,
//! decoding and directory failures are all surfaced here and never retried locally.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for management operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Remote service is unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Failed to decode a response body
    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    /// Invalid GUID format
    #[error("Invalid GUID: {0}")]
    InvalidGuid(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout waiting for service: {0}")]
    Timeout(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bad request with details
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External service error
    #[error("External service error: {service}: {message}")]
    ExternalServiceError {
        /// Service name that failed
        service: String,
        /// Error message
        message: String,
    },

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for management operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::DecodeError(_) => "DECODE_ERROR",
            Self::InvalidGuid(_) => "INVALID_GUID",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_) | Self::ExternalServiceError { .. } | Self::ServiceUnavailable(_)
        )
    }

    /// Maps a non-success HTTP status and its body text to an error.
    ///
    /// `service` names the remote API in the message (e.g. `Cloud Controller`).
    #[must_use]
    pub fn from_status(service: &str, status: StatusCode, text: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(text),
            StatusCode::BAD_REQUEST => Self::BadRequest(text),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::InvalidRequest(format!("{service} authentication failed: {text}"))
            }
            StatusCode::CONFLICT => Self::Conflict(text),
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => {
                Self::ServiceUnavailable(format!("{service} temporarily unavailable: {text}"))
            }
            status if status.is_server_error() => {
                Self::ServiceUnavailable(format!("{service} server error {status}: {text}"))
            }
            _ => Self::HttpError(format!("{service} error {status}: {text}")),
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::DecodeError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidGuid(err.to_string())
    }
}
