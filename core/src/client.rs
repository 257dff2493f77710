//! The client façade.
//!
//! # Design
//! `HttpClient` holds an `Arc<ClientConfig>` and nothing else, so clones are
//! cheap and concurrent calls share no mutable state. Every verb method goes
//! through [`HttpClient::request`]: build the request, run the transport
//! under the cancellation coordinator, then decode the body. Timers and abort
//! listeners are owned by the coordinator's future and are gone by the time
//! `request` returns.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::builder::{build_request, CallOptions};
use crate::cancel::{CancellationCoordinator, Timer, TokioTimer};
use crate::codec::decode_body;
use crate::config::{validate_base_url, ClientConfig, ClientSettings};
use crate::error::HttpError;
use crate::http::{Headers, HttpMethod, Response};
use crate::transport::HttpTransport;

/// Transport-agnostic HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: Arc<ClientConfig>,
}

impl HttpClient {
    pub fn builder(transport: impl HttpTransport + 'static) -> HttpClientBuilder {
        HttpClientBuilder::new(Arc::new(transport))
    }

    /// Build a client from serialized settings.
    pub fn from_settings(
        settings: &ClientSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, HttpError> {
        let mut builder = HttpClientBuilder::new(transport);
        if let Some(base_url) = &settings.base_url {
            builder = builder.base_url(base_url);
        }
        for (name, value) in &settings.headers {
            builder = builder.header(name, value.as_str());
        }
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Get, options).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Post, options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Put, options).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Patch, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Delete, options).await
    }

    pub async fn head<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Head, options).await
    }

    pub async fn options<T: DeserializeOwned>(
        &self,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        self.request(HttpMethod::Options, options).await
    }

    /// Perform one call. `method` applies unless `options.method` is set.
    #[instrument(skip(self, options), fields(url = %options.url))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        options: CallOptions,
    ) -> Result<Response<T>, HttpError> {
        let request = build_request(&self.config, method, &options)?;
        debug!(method = %request.method, url = %request.url, "sending request");

        let timeout = options.timeout.or(self.config.timeout);
        let coordinator = CancellationCoordinator::new(self.config.timer.clone());
        let transport = &self.config.transport;
        let response = coordinator
            .run(options.abort_signal.as_ref(), timeout, |signal| {
                transport.send(request.with_abort_signal(signal))
            })
            .await?;

        debug!(status = response.status, "response received");
        let body = decode_body(&response)?;
        Ok(Response {
            url: response.url,
            status: response.status,
            headers: response.headers,
            body,
        })
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    base_url: Option<String>,
    headers: Headers,
    timeout: Option<Duration>,
    transport: Arc<dyn HttpTransport>,
    timer: Arc<dyn Timer>,
}

impl fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClientBuilder {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: None,
            headers: Headers::new(),
            timeout: None,
            transport,
            timer: Arc::new(TokioTimer),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Default timeout for every call; calls may override it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the timer used for timeouts.
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        if let Some(base_url) = &self.base_url {
            validate_base_url(base_url)?;
        }
        Ok(HttpClient {
            config: Arc::new(ClientConfig {
                base_url: self.base_url,
                headers: self.headers,
                timeout: self.timeout,
                transport: self.transport,
                timer: self.timer,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::future::BoxFuture;
    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::*;
    use crate::cancel::{AbortController, AbortSignal};
    use crate::error::{BodyDirection, TransportError};
    use crate::http::{ResponseBody, TransportRequest, TransportResponse};

    /// Records every request. Answers with `response` if set, otherwise waits
    /// for the request's abort signal and fails.
    #[derive(Debug, Default)]
    struct FakeTransport {
        response: Option<TransportResponse>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl FakeTransport {
        fn responding(response: TransportResponse) -> Arc<Self> {
            Arc::new(Self {
                response: Some(response),
                ..Default::default()
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> TransportRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(response) = &self.response {
                return Ok(response.clone());
            }
            match &request.abort_signal {
                Some(signal) => {
                    signal.aborted().await;
                    Err("aborted".into())
                }
                None => pending().await,
            }
        }
    }

    #[derive(Debug, Default)]
    struct CountingTimer {
        active: Arc<AtomicUsize>,
    }

    struct Live(Arc<AtomicUsize>);

    impl Drop for Live {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Timer for CountingTimer {
        fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
            self.active.fetch_add(1, Ordering::SeqCst);
            let live = Live(self.active.clone());
            Box::pin(async move {
                let _live = live;
                tokio::time::sleep(duration).await;
            })
        }
    }

    fn json_response(body: Value) -> TransportResponse {
        TransportResponse {
            url: "https://example.com/response".to_string(),
            status: 200,
            headers: [("content-type", "application/json")].into_iter().collect(),
            body: ResponseBody::from(body.to_string()),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ack {
        ok: bool,
    }

    #[tokio::test]
    async fn json_encode_and_decode() {
        let transport = FakeTransport::responding(json_response(json!({"ok": true})));
        let client = HttpClient::builder(transport.clone())
            .base_url("https://example.com/api")
            .header("X-Default", "1")
            .build()
            .unwrap();

        let response = client
            .post::<Ack>(
                CallOptions::new("/v1/test")
                    .query("a", "1")
                    .query("b", ["x", "y"])
                    .header("Content-Type", "application/json")
                    .header("X-Req", "2")
                    .body(json!({"hello": "world"})),
            )
            .await
            .unwrap();

        assert_eq!(response.body, Ack { ok: true });
        assert_eq!(response.status, 200);
        assert_eq!(response.url, "https://example.com/response");

        assert_eq!(transport.calls(), 1);
        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://example.com/api/v1/test?a=1&b=x&b=y");
        let expected: Headers = [
            ("x-default", "1"),
            ("content-type", "application/json"),
            ("x-req", "2"),
        ]
        .into_iter()
        .collect();
        assert_eq!(request.headers, expected);
        assert_eq!(request.body.as_deref(), Some(r#"{"hello":"world"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_request_content_type_arms_no_timer() {
        let transport = FakeTransport::responding(json_response(json!({"ok": true})));
        let timer = CountingTimer::default();
        let active = timer.active.clone();
        let client = HttpClient::builder(transport.clone())
            .timeout(Duration::from_millis(1000))
            .timer(Arc::new(timer))
            .build()
            .unwrap();

        let err = client
            .post::<Value>(CallOptions::new("/v1/test").body(json!({"not": "transport body init"})))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HttpError::UnsupportedContentType {
                direction: BodyDirection::Request,
                ..
            }
        ));
        assert_eq!(active.load(Ordering::SeqCst), 0);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_response_content_type() {
        let transport = FakeTransport::responding(TransportResponse {
            url: "https://example.com/response".to_string(),
            status: 200,
            headers: [("content-type", "application/xml")].into_iter().collect(),
            body: ResponseBody::from("<ok />"),
        });
        let client = HttpClient::builder(transport.clone()).build().unwrap();

        let err = client.get::<Value>(CallOptions::new("/v1/test")).await.unwrap_err();

        assert!(matches!(
            err,
            HttpError::UnsupportedContentType {
                content_type: Some(ref ct),
                ..
            } if ct == "application/xml"
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn abort_before_send_skips_transport() {
        let transport = FakeTransport::responding(json_response(json!({"ok": true})));
        let client = HttpClient::builder(transport.clone()).build().unwrap();

        let err = client
            .get::<Value>(CallOptions::new("/v1/test").abort_signal(AbortSignal::already_aborted()))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Aborted));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn abort_during_send() {
        let transport = FakeTransport::hanging();
        let client = HttpClient::builder(transport.clone()).build().unwrap();
        let controller = AbortController::new();

        let call =
            client.get::<Value>(CallOptions::new("/v1/test").abort_signal(controller.signal()));
        let (result, ()) = tokio::join!(call, async {
            tokio::task::yield_now().await;
            controller.abort();
        });

        assert!(matches!(result, Err(HttpError::Aborted)));
        assert_eq!(transport.calls(), 1);
        let signal = transport.last_request().abort_signal.unwrap();
        assert!(signal.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_configured_value() {
        let transport = FakeTransport::hanging();
        let client = HttpClient::builder(transport.clone())
            .timeout(Duration::from_millis(10))
            .build()
            .unwrap();

        let err = client.get::<Value>(CallOptions::new("/v1/test")).await.unwrap_err();

        assert!(matches!(err, HttpError::Timeout { timeout_ms: 10 }));
        assert!(transport.last_request().abort_signal.unwrap().is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn call_timeout_overrides_client_default() {
        let transport = FakeTransport::hanging();
        let client = HttpClient::builder(transport)
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        let err = client
            .get::<Value>(CallOptions::new("/v1/test").timeout(Duration::from_millis(25)))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Timeout { timeout_ms: 25 }));
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_clears_timeout_after_success() {
        let transport = FakeTransport::responding(json_response(json!({"ok": true})));
        let timer = CountingTimer::default();
        let active = timer.active.clone();
        let client = HttpClient::builder(transport.clone())
            .timeout(Duration::from_millis(50))
            .timer(Arc::new(timer))
            .build()
            .unwrap();

        client.get::<Ack>(CallOptions::new("/v1/test")).await.unwrap();
        assert_eq!(active.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(50)).await;
        let signal = transport.last_request().abort_signal.unwrap();
        assert!(!signal.is_aborted());
    }

    #[tokio::test]
    async fn transport_failure_is_not_reclassified() {
        #[derive(Debug)]
        struct Refused;

        #[async_trait]
        impl HttpTransport for Refused {
            async fn send(&self, _: TransportRequest) -> Result<TransportResponse, TransportError> {
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )))
            }
        }

        let client = HttpClient::builder(Refused).build().unwrap();
        let err = client.get::<Value>(CallOptions::new("http://localhost/x")).await.unwrap_err();

        match err {
            HttpError::Transport(source) => {
                let io = source.downcast_ref::<std::io::Error>().unwrap();
                assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn response_header_names_are_lower_cased() {
        let mut response = json_response(json!(null));
        response.headers = [("Content-Type", "application/json"), ("X-Trace", "abc")]
            .into_iter()
            .collect();
        let transport = FakeTransport::responding(response);
        let client = HttpClient::builder(transport).build().unwrap();

        let response = client.get::<Value>(CallOptions::new("/x")).await.unwrap();

        assert_eq!(response.headers.iter().nth(1), Some(("x-trace", "abc")));
    }

    #[tokio::test]
    async fn repeated_response_headers_reach_the_caller_joined() {
        let mut response = json_response(json!(null));
        response.headers = [
            ("Content-Type", "application/json"),
            ("Vary", "accept"),
            ("Vary", "origin"),
        ]
        .into_iter()
        .collect();
        let transport = FakeTransport::responding(response);
        let client = HttpClient::builder(transport).build().unwrap();

        let response = client.get::<Value>(CallOptions::new("/x")).await.unwrap();

        assert_eq!(response.headers.get("vary"), Some("accept, origin"));
    }

    #[tokio::test]
    async fn verbs_set_their_method() {
        let transport = FakeTransport::responding(json_response(json!({})));
        let client = HttpClient::builder(transport.clone()).build().unwrap();

        client.put::<Value>(CallOptions::new("/x")).await.unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Put);
        client.patch::<Value>(CallOptions::new("/x")).await.unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Patch);
        client.delete::<Value>(CallOptions::new("/x")).await.unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Delete);
        client.head::<Value>(CallOptions::new("/x")).await.unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Head);
        client.options::<Value>(CallOptions::new("/x")).await.unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Options);
        client
            .get::<Value>(CallOptions::new("/x").method("post"))
            .await
            .unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Post);
        assert_eq!(transport.calls(), 6);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_client() {
        let transport = FakeTransport::responding(json_response(json!({"ok": true})));
        let client = HttpClient::builder(transport.clone())
            .base_url("https://example.com")
            .build()
            .unwrap();

        let other = client.clone();
        let (a, b) = tokio::join!(
            client.get::<Ack>(CallOptions::new("/a")),
            other.get::<Ack>(CallOptions::new("/b")),
        );

        assert!(a.unwrap().body.ok);
        assert!(b.unwrap().body.ok);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn builder_rejects_relative_base_url() {
        let err = HttpClient::builder(FakeTransport::hanging())
            .base_url("/api")
            .build()
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[test]
    fn from_settings_applies_defaults() {
        let settings = ClientSettings::from_json(
            r#"{"base_url":"https://example.com/api","headers":{"X-Default":"1"},"timeout_ms":75}"#,
        )
        .unwrap();

        let client = HttpClient::from_settings(&settings, FakeTransport::hanging()).unwrap();

        let config = client.config();
        assert_eq!(config.base_url.as_deref(), Some("https://example.com/api"));
        assert_eq!(config.headers.get("x-default"), Some("1"));
        assert_eq!(config.timeout, Some(Duration::from_millis(75)));
    }
}
