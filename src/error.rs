//! Error types for the cryptomarket crate.
//!
//! This module defines the errors that can occur when talking to the
//! exchange: network failures, authentication problems and API error
//! responses.
//!
//! Orderbook sequence gaps are deliberately absent: a gap is a routine,
//! recoverable condition reported through [`BookState`](crate::orderbook::BookState),
//! not an error.

use thiserror::Error;

use crate::types::messages::RpcError;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration (missing fields, bad format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// REST API returned an error response
    #[error("API error ({}): {}", .0.status, .0.message)]
    Api(ApiError),

    /// WebSocket request was answered with an error
    #[error("Request {id:?} failed: {error}")]
    Rpc {
        /// ID of the failed request
        id: Option<u64>,
        /// Error returned by the server
        error: RpcError,
    },

    /// Rate limit exceeded
    #[error("Rate limited{}", retry_suffix(.retry_after_ms))]
    RateLimited {
        /// Retry after this many milliseconds
        retry_after_ms: Option<u64>,
    },

    /// Authentication failed or credentials are missing
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// WebSocket connection closed unexpectedly
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
}

/// Error returned by the REST API
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Error code from API (if provided)
    pub code: Option<i64>,
    /// Error message
    pub message: String,
    /// Longer explanation (if provided)
    pub description: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            description: None,
        }
    }

    /// Create an API error with an error code
    pub fn with_code(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code),
            message: message.into(),
            description: None,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

fn retry_suffix(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {}ms", ms),
        None => String::new(),
    }
}

impl From<tokio_tungstenite::tungstenite::http::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::http::Error) -> Self {
        Error::Config(format!("HTTP error building WebSocket request: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api(ApiError::new(400, "Bad request"));
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Bad request"));
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::RateLimited {
            retry_after_ms: Some(1000),
        };
        assert!(err.to_string().contains("1000"));

        let err = Error::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_rpc_error_display() {
        let err = Error::Rpc {
            id: Some(12),
            error: RpcError {
                code: 2001,
                message: "Symbol not found".to_string(),
                description: None,
            },
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("2001"));
    }

    #[test]
    fn test_api_error_classification() {
        assert!(ApiError::with_code(404, 2001, "Symbol not found").is_client_error());
        assert!(ApiError::new(503, "Unavailable").is_server_error());
    }
}
