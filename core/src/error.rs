//! Error types for the HTTP client core.
//!
//! # Design
//! Cancellation gets two dedicated variants because callers routinely tell
//! "I gave up" (`Aborted`) apart from "the deadline passed" (`Timeout`).
//! Errors raised by the transport are carried through untouched in
//! `Transport` so the caller can still downcast to the concrete type.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by an [`HttpTransport`](crate::transport::HttpTransport).
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which side of the exchange a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyDirection {
    Request,
    Response,
}

impl fmt::Display for BodyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyDirection::Request => write!(f, "request"),
            BodyDirection::Response => write!(f, "response"),
        }
    }
}

/// Errors returned by [`HttpClient`](crate::client::HttpClient) calls.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A body could not be encoded or decoded for its content type.
    ///
    /// `content_type` is `None` when no content type was declared at all.
    #[error("{}", unsupported_message(*direction, content_type.as_deref()))]
    UnsupportedContentType {
        direction: BodyDirection,
        content_type: Option<String>,
    },

    /// The caller's abort signal fired before the call settled.
    #[error("request aborted")]
    Aborted,

    /// The call did not settle within the configured timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The transport rejected the request.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body (or a query string) could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The configured base URL is not a valid absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl HttpError {
    /// True for the two cancellation outcomes, `Aborted` and `Timeout`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HttpError::Aborted | HttpError::Timeout { .. })
    }
}

fn unsupported_message(direction: BodyDirection, content_type: Option<&str>) -> String {
    match content_type {
        Some(content_type) => format!("unsupported {direction} content type: {content_type}"),
        None => format!("could not determine {direction} content type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_request_without_content_type_display() {
        let error = HttpError::UnsupportedContentType {
            direction: BodyDirection::Request,
            content_type: None,
        };
        assert_eq!(error.to_string(), "could not determine request content type");
    }

    #[test]
    fn unsupported_response_names_received_type() {
        let error = HttpError::UnsupportedContentType {
            direction: BodyDirection::Response,
            content_type: Some("application/xml".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "unsupported response content type: application/xml"
        );
    }

    #[test]
    fn timeout_display_carries_duration() {
        let error = HttpError::Timeout { timeout_ms: 10 };
        assert_eq!(error.to_string(), "request timed out after 10ms");
        assert!(error.is_cancellation());
    }

    #[test]
    fn transport_error_keeps_source() {
        let error = HttpError::Transport("connection refused".into());
        assert_eq!(error.to_string(), "transport error: connection refused");
        let source = std::error::Error::source(&error).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
        assert!(!error.is_cancellation());
    }
}
