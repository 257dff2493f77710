//! The transport seam.
//!
//! The core never performs I/O. A host plugs in an [`HttpTransport`] that
//! executes a fully built [`TransportRequest`] and returns the raw response.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{TransportRequest, TransportResponse};

/// Performs one request/response exchange.
///
/// Implementations should watch `request.abort_signal` and give up once it
/// reports aborted. What they return in that case does not matter: the
/// client has already settled the call by then and stops polling.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}
