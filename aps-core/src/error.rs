//! Top-level error types for the APS SDK.

use thiserror::Error;

use crate::http::{HttpRequestError, TransportError};
use crate::token::AuthError;

/// Top-level error type encompassing all SDK errors.
#[derive(Debug, Error)]
pub enum ApsError {
    /// No response was obtained from the server.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("http error: {0}")]
    Http(#[from] HttpRequestError),

    /// Token acquisition failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// An endpoint that must return data returned nothing.
    #[error("unexpected empty response from {operation}")]
    UnexpectedEmptyResponse { operation: String },

    /// A response body could not be decoded.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request could not be built.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ApsError {
    /// Shorthand for [`ApsError::UnexpectedEmptyResponse`].
    pub fn empty_response(operation: impl Into<String>) -> Self {
        Self::UnexpectedEmptyResponse {
            operation: operation.into(),
        }
    }

    /// Status code of the failed response, for HTTP failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status_code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_only_for_http_errors() {
        let err = ApsError::from(TransportError::Timeout {
            url: "https://example.com".to_string(),
        });
        assert_eq!(err.status_code(), None);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_empty_response_message() {
        let err = ApsError::empty_response("list projects");
        assert_eq!(err.to_string(), "unexpected empty response from list projects");
    }
}
