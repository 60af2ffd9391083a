//! B2 API Error Types
//!
//! One error type for every client operation. Transport failures, errors
//! reported by the B2 service and locally rejected arguments are kept in
//! separate variants so callers can tell "never sent" from "rejected".

use super::types::ApiError;

/// Result type for B2 client operations
pub type Result<T> = std::result::Result<T, B2Error>;

/// B2 client error types
#[derive(Debug, thiserror::Error)]
pub enum B2Error {
    /// The service answered with a well-formed error body
    #[error("B2 API error ({}, {}): {}", .0.status, .0.code, .0.message)]
    Api(ApiError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode B2 response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success response whose body is not a B2 error document
    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// Rejected before any request was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl B2Error {
    /// The API error, if the service rejected the request
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            B2Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure was detected locally without any network call
    pub fn is_local(&self) -> bool {
        matches!(self, B2Error::InvalidArgument(_))
    }

    /// Whether the service reported an expired or invalid token
    pub fn is_unauthorized(&self) -> bool {
        self.api_error().map_or(false, |e| e.status == 401)
    }

    /// Whether the service reported a missing bucket or file
    pub fn is_not_found(&self) -> bool {
        self.api_error().map_or(false, |e| e.status == 404)
    }

    /// Whether the service is asking the caller to slow down
    pub fn is_rate_limited(&self) -> bool {
        self.api_error().map_or(false, |e| e.status == 429)
    }

    /// Build the error for a non-success response body.
    ///
    /// A body that does not parse as a B2 error document is reported as
    /// `UnexpectedResponse` with the raw text.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiError>(body) {
            Ok(api_error) => B2Error::Api(api_error),
            Err(_) => B2Error::UnexpectedResponse {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}
