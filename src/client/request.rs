//! Request and response types for the resilient client.

use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::resilience::BreakerState;

/// Per-call priority, propagated downstream as `x-request-priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// Configuration for one logical request. Built with the chainable setters;
/// everything beyond method and path is optional.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    /// Path relative to the instance's base path, e.g. `/jobs/123`.
    pub path: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub priority: Priority,
    /// Propagated if set; generated otherwise.
    pub correlation_id: Option<String>,
    /// Escape hatch: skip the breaker gate (outcomes are still recorded).
    pub bypass_circuit_breaker: bool,
    /// Per-call override of the configured request timeout.
    pub timeout: Option<Duration>,
    /// Caller classification of which upstream statuses deserve a retry.
    /// Defaults to 5xx plus 408/429.
    pub retry_on_status: Option<fn(u16) -> bool>,
}

impl RequestConfig {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
            priority: Priority::default(),
            correlation_id: None,
            bypass_circuit_breaker: false,
            timeout: None,
            retry_on_status: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn bypass_circuit_breaker(mut self) -> Self {
        self.bypass_circuit_breaker = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_on_status(mut self, classify: fn(u16) -> bool) -> Self {
        self.retry_on_status = Some(classify);
        self
    }
}

/// Result of a successful call, including how it was resolved.
#[derive(Debug)]
pub struct ServiceResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Total wall time including retries and backoff.
    pub response_time: Duration,
    /// Number of attempts consumed, including the successful one.
    pub attempts: u32,
    /// Breaker state observed after recording the outcome.
    pub breaker_state: BreakerState,
    /// Id of the instance that served the request.
    pub instance_id: String,
}

impl ServiceResponse {
    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::InvalidRequest(format!("response body is not valid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_fields() {
        let config = RequestConfig::post("/jobs")
            .query("page", "2")
            .header("x-tenant", "acme")
            .json(serde_json::json!({"title": "Engineer"}))
            .priority(Priority::High)
            .correlation_id("abc-123")
            .bypass_circuit_breaker()
            .timeout(Duration::from_secs(2));

        assert_eq!(config.method, Method::POST);
        assert_eq!(config.params, vec![("page".to_string(), "2".to_string())]);
        assert_eq!(config.priority, Priority::High);
        assert_eq!(config.correlation_id.as_deref(), Some("abc-123"));
        assert!(config.bypass_circuit_breaker);
        assert_eq!(config.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn response_json_round_trips() {
        let response = ServiceResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"id": 7}"#),
            response_time: Duration::from_millis(12),
            attempts: 1,
            breaker_state: BreakerState::Closed,
            instance_id: "i-1".into(),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 7);
    }
}
