//! Client configuration.
//!
//! `ClientConfig` is the resolved, immutable configuration an `HttpClient`
//! shares across calls. `ClientSettings` is its serializable subset, for hosts
//! that keep client defaults in a JSON config file.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cancel::Timer;
use crate::error::HttpError;
use crate::http::Headers;
use crate::transport::HttpTransport;

/// Defaults applied to every call made through one client.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub headers: Headers,
    pub timeout: Option<Duration>,
    pub transport: Arc<dyn HttpTransport>,
    pub timer: Arc<dyn Timer>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

/// Serializable client defaults.
///
/// ```
/// use courier_core::ClientSettings;
///
/// let settings = ClientSettings::from_json(
///     r#"{"base_url": "https://example.com/api", "timeout_ms": 1000}"#,
/// )
/// .unwrap();
/// assert_eq!(settings.timeout_ms, Some(1000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ClientSettings {
    pub fn from_json(raw: &str) -> Result<Self, HttpError> {
        serde_json::from_str(raw).map_err(|e| HttpError::Deserialization(e.to_string()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Check that `base_url` is an absolute URL.
pub(crate) fn validate_base_url(base_url: &str) -> Result<(), HttpError> {
    url::Url::parse(base_url)
        .map(|_| ())
        .map_err(|e| HttpError::InvalidUrl(format!("{base_url}: {e}")))
}
