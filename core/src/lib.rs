//! Transport-agnostic HTTP client core.
//!
//! # Overview
//! Builds requests from a base URL, path, query, headers and body, hands them
//! to an injected [`HttpTransport`], and decodes the response body by content
//! type. The core never does network I/O itself (host-does-IO pattern).
//!
//! # Design
//! - `HttpClient` is immutable after construction; it holds an
//!   `Arc<ClientConfig>` and is safe to share between concurrent calls.
//! - Each call races the transport against the caller's [`AbortSignal`] and a
//!   timeout timer. The first to finish decides the outcome; the timer and
//!   the abort listener are released on every path.
//! - Timers come from an injected [`Timer`], so tests can observe them.
//!
//! ```no_run
//! use courier_core::{CallOptions, HttpClient, HttpTransport};
//! use serde_json::Value;
//!
//! async fn fetch(
//!     transport: impl HttpTransport + 'static,
//! ) -> Result<Value, courier_core::HttpError> {
//!     let client = HttpClient::builder(transport)
//!         .base_url("https://example.com/api")
//!         .header("Accept", "application/json")
//!         .build()?;
//!     let response = client
//!         .get::<Value>(CallOptions::new("/v1/items").query("tag", ["a", "b"]))
//!         .await?;
//!     Ok(response.body)
//! }
//! ```

pub mod builder;
pub mod cancel;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod transport;

pub use builder::{build_request, CallOptions};
pub use cancel::{AbortController, AbortSignal, CancellationCoordinator, Timer, TokioTimer};
pub use client::{HttpClient, HttpClientBuilder};
pub use codec::{ContentKind, EncodedBody};
pub use config::{ClientConfig, ClientSettings};
pub use error::{BodyDirection, HttpError, TransportError};
pub use http::{Headers, HttpMethod, Response, ResponseBody, TransportRequest, TransportResponse};
pub use query::{QueryParams, QueryValue};
pub use transport::HttpTransport;
