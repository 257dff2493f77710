//! Body encoding and decoding by content type.
//!
//! Only JSON is supported in either direction. Content types are compared on
//! their essence (`type/subtype`), ignoring parameters and case, so
//! `Application/JSON; charset=utf-8` is JSON. Structured-syntax suffix types
//! such as `application/problem+json` are accepted as JSON too.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BodyDirection, HttpError};
use crate::http::{Headers, TransportResponse};

pub const CONTENT_TYPE: &str = "content-type";

/// Body formats the codec knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
}

impl ContentKind {
    /// Classify a `content-type` header value. `None` means unsupported.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = essence(content_type);
        let is_json = essence == "application/json"
            || (essence.starts_with("application/") && essence.ends_with("+json"));
        is_json.then_some(ContentKind::Json)
    }
}

/// An outgoing body rendered to text, with the content type it was encoded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content: String,
    pub content_type: String,
}

/// Serialize `body` according to the `content-type` found in `headers`.
pub fn encode_body(body: &Value, headers: &Headers) -> Result<EncodedBody, HttpError> {
    let content_type = headers.get(CONTENT_TYPE).ok_or(HttpError::UnsupportedContentType {
        direction: BodyDirection::Request,
        content_type: None,
    })?;

    match ContentKind::from_content_type(content_type) {
        Some(ContentKind::Json) => {
            let content = serde_json::to_string(body)
                .map_err(|e| HttpError::Serialization(e.to_string()))?;
            Ok(EncodedBody {
                content,
                content_type: content_type.to_string(),
            })
        }
        None => Err(HttpError::UnsupportedContentType {
            direction: BodyDirection::Request,
            content_type: Some(content_type.to_string()),
        }),
    }
}

/// Parse the response body according to its `content-type` header.
///
/// An empty body decodes as JSON `null` whatever the content type, which lets
/// `()`, `Option<_>` and `Value` targets accept bodiless responses.
pub fn decode_body<T: DeserializeOwned>(response: &TransportResponse) -> Result<T, HttpError> {
    let text = response.body.text.as_str();
    if text.is_empty() {
        return serde_json::from_value(Value::Null)
            .map_err(|e| HttpError::Deserialization(e.to_string()));
    }

    let content_type = response.headers.get(CONTENT_TYPE);
    match content_type.and_then(ContentKind::from_content_type) {
        Some(ContentKind::Json) => {
            serde_json::from_str(text).map_err(|e| HttpError::Deserialization(e.to_string()))
        }
        None => Err(HttpError::UnsupportedContentType {
            direction: BodyDirection::Response,
            content_type: content_type.map(str::to_string),
        }),
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
