use crate::util::retry::Retryable;
use thiserror::Error;

/// Status codes worth another attempt.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Errors returned by the monitoring API client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed")]
    Authentication,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to connect to API: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Api { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            ApiError::Connection(_) | ApiError::Timeout(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}

/// Result type for monitoring API calls
pub type ApiResult<T> = Result<T, ApiError>;
