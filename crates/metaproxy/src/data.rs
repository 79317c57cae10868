//! Data layer: immutable configuration and per-call request/outcome types.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Default body ceiling, 10 MB.
pub const DEFAULT_MAX_BYTES: u64 = 10_000_000;

/// Default deadline over the whole fetch phase.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default identifying user agent sent with outbound requests.
pub const DEFAULT_USER_AGENT: &str = "metaproxy";

/// Process-lifetime configuration for a [`Fetcher`](crate::Fetcher).
///
/// The proxy never reads ambient environment state; whoever constructs the
/// fetcher decides these values once, and they are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Whether fetching is allowed at all.
    pub enabled: bool,
    /// Hard cap on response body bytes, enforced while streaming.
    pub max_bytes: u64,
    /// Single deadline covering validation, request, and body read.
    pub timeout: Duration,
    /// User agent used when the caller supplies none.
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: DEFAULT_MAX_BYTES,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// One fetch call. Constructed per call, discarded after.
///
/// Headers are an ordered list and travel to the target verbatim. The
/// optional deadline and byte ceiling override the configured values for
/// this call only.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub max_bytes: Option<u64>,
}

impl FetchRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: Vec::new(),
            timeout: None,
            max_bytes: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
    Binary(Bytes),
}

/// A successfully fetched resource: decoded payload plus the upstream
/// response headers, unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub payload: Payload,
    pub headers: Vec<(String, String)>,
}

/// A composed outbound reply, success or error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Case-insensitive lookup in an ordered header list. First match wins.
pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ProxyConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn config_builder() {
        let config = ProxyConfig::new()
            .with_enabled(false)
            .with_max_bytes(1024)
            .with_timeout(Duration::from_millis(250))
            .with_user_agent("explorer/1.0");
        assert!(!config.enabled);
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.user_agent, "explorer/1.0");
    }

    #[test]
    fn request_builder() {
        let request = FetchRequest::new("http://example.com/data.json")
            .with_header("Accept", "application/json")
            .with_timeout(Duration::from_millis(100))
            .with_max_bytes(100);
        assert_eq!(request.uri, "http://example.com/data.json");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.timeout, Some(Duration::from_millis(100)));
        assert_eq!(request.max_bytes, Some(100));
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_ordered() {
        let headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ];
        assert_eq!(header(&headers, "content-type"), Some("text/plain"));
        assert_eq!(header(&headers, "etag"), None);
    }
}
