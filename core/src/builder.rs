//! Per-call options and the request builder.
//!
//! # Design
//! `build_request` is a pure function of the client configuration and the
//! call options: no clocks, no randomness, no I/O. The abort signal is not
//! part of the built request; the coordinator attaches the effective signal
//! right before the transport is invoked.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::cancel::AbortSignal;
use crate::codec::{self, CONTENT_TYPE};
use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::http::{Headers, HttpMethod, TransportRequest};
use crate::query::{self, QueryParams, QueryValue};

/// Everything a single call may set on top of the client defaults.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Absolute URL, or a path relative to the client's base URL.
    ///
    /// Anything that parses with a scheme is absolute, so a relative path
    /// whose first segment holds a colon (`documents:batchGet`) must be
    /// written as `./documents:batchGet`.
    pub url: String,
    /// Overrides the verb of the method the options are passed to.
    pub method: Option<HttpMethod>,
    pub query: QueryParams,
    pub headers: Headers,
    /// Encoded according to the merged `content-type` header.
    pub body: Option<Value>,
    pub abort_signal: Option<AbortSignal>,
    /// Overrides the client's default timeout.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: impl Into<HttpMethod>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key, value);
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` into the options. The wire format is still chosen by
    /// the `content-type` header at build time.
    pub fn serialize_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_value(body).map_err(|e| HttpError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Assemble the transport request for one call.
pub fn build_request(
    config: &ClientConfig,
    default_method: HttpMethod,
    options: &CallOptions,
) -> Result<TransportRequest, HttpError> {
    let url = resolve_url(config.base_url.as_deref(), &options.url);
    let url = append_query(url, &query::encode(&options.query));

    let mut headers = config.headers.clone();
    headers.merge(&options.headers);

    let body = match &options.body {
        Some(body) => {
            let encoded = codec::encode_body(body, &headers)?;
            headers.insert(CONTENT_TYPE, encoded.content_type);
            Some(encoded.content)
        }
        None => None,
    };

    Ok(TransportRequest {
        method: options.method.clone().unwrap_or(default_method),
        url,
        headers,
        body,
        abort_signal: None,
    })
}

/// Join `base` and `path` with exactly one slash, unless `path` is absolute.
/// A leading `./` on `path` is dropped when joining.
pub fn resolve_url(base: Option<&str>, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    let Some(base) = base else {
        return path.to_string();
    };

    let base = base.trim_end_matches('/');
    let path = path.strip_prefix("./").unwrap_or(path).trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Insert `query` before any fragment, with `&` if a query is already there.
fn append_query(url: String, query: &str) -> String {
    if query.is_empty() {
        return url;
    }
    let (target, fragment) = url.split_at(url.find('#').unwrap_or(url.len()));
    let separator = if target.contains('?') { '&' } else { '?' };
    format!("{target}{separator}{query}{fragment}")
}

fn is_absolute(url: &str) -> bool {
    url::Url::parse(url).is_ok()
}
