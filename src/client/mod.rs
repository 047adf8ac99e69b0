//! Resilient client subsystem.
//!
//! # Data Flow
//! ```text
//! factory.rs: one memoized ServiceClient per downstream service
//!     → request.rs (per-call configuration, response envelope)
//!     → interceptor.rs (ordered request/response/error transforms)
//!     → circuit breaker gate (unless bypassed)
//!     → retry loop:
//!         registry.get_instance → build URL → send under hard timeout
//!         outcome recorded into the breaker
//!         retryable failure → backoff sleep → next attempt
//! ```
//!
//! # Design Decisions
//! - The breaker is consulted once per logical call, not per attempt; a
//!   rejected call consumes no retries
//! - Every attempt may land on a different instance
//! - Attempts within one call are strictly sequential

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time;
use uuid::Uuid;

use crate::config::{CircuitBreakerConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::resilience::{retry_delay, BreakerSnapshot, CircuitBreaker};

pub mod factory;
pub mod interceptor;
pub mod request;

pub use factory::{ClientFactory, ClientOptions};
pub use interceptor::{HeaderInterceptor, Interceptor, InterceptorChain};
pub use request::{Priority, RequestConfig, ServiceResponse};

/// Correlation header attached to every outbound request.
pub const CORRELATION_HEADER: &str = "x-correlation-id";
/// Requester identity header.
pub const REQUESTED_BY_HEADER: &str = "x-requested-by";
/// Priority propagation header.
pub const PRIORITY_HEADER: &str = "x-request-priority";

/// HTTP client for mesh traffic. Instances are addressed directly by host
/// and port; environment HTTP proxies must not intercept probes or RPC calls.
pub(crate) fn direct_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

struct AttemptOutput {
    status: u16,
    headers: http::HeaderMap,
    body: bytes::Bytes,
    instance_id: String,
}

/// Orchestrates one downstream service: breaker gating, instance selection,
/// timeouts, retries with backoff, and outcome reporting.
pub struct ServiceClient {
    service: String,
    caller: String,
    registry: Arc<ServiceRegistry>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    http: reqwest::Client,
    interceptors: InterceptorChain,
}

impl ServiceClient {
    pub fn new(
        service: impl Into<String>,
        caller: impl Into<String>,
        registry: Arc<ServiceRegistry>,
        http: reqwest::Client,
        retry: RetryPolicy,
        breaker_config: CircuitBreakerConfig,
        interceptors: InterceptorChain,
    ) -> Self {
        let service = service.into();
        Self {
            breaker: CircuitBreaker::new(service.clone(), breaker_config),
            service,
            caller: caller.into(),
            registry,
            retry,
            http,
            interceptors,
        }
    }

    /// Downstream service this client talks to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Diagnostic snapshot of this client's breaker.
    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Administrative reset of this client's breaker.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
        metrics::record_breaker_state(&self.service, self.breaker.state());
    }

    /// Execute one logical request with gating, retries, and backoff.
    pub async fn request(&self, config: RequestConfig) -> Result<ServiceResponse> {
        let started = Instant::now();
        let config = self.interceptors.apply_request(config);

        let correlation_id = config
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if !config.bypass_circuit_breaker && !self.breaker.can_execute() {
            tracing::warn!(
                service = %self.service,
                correlation_id = %correlation_id,
                "Request rejected: circuit breaker open"
            );
            metrics::record_request(&self.service, "circuit_open", started.elapsed());
            return Err(self
                .interceptors
                .apply_error(Error::CircuitOpen { service: self.service.clone() }));
        }

        let timeout = config.timeout.unwrap_or_else(|| self.breaker.request_timeout());

        for attempt in 1..=self.retry.max_attempts {
            match self.attempt(&config, &correlation_id, timeout).await {
                Ok(output) => {
                    self.breaker.record_success();
                    metrics::record_breaker_state(&self.service, self.breaker.state());
                    let elapsed = started.elapsed();
                    metrics::record_request(&self.service, "success", elapsed);

                    tracing::debug!(
                        service = %self.service,
                        correlation_id = %correlation_id,
                        status = output.status,
                        attempts = attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        instance_id = %output.instance_id,
                        "Request succeeded"
                    );

                    let response = ServiceResponse {
                        status: output.status,
                        headers: output.headers,
                        body: output.body,
                        response_time: elapsed,
                        attempts: attempt,
                        breaker_state: self.breaker.state(),
                        instance_id: output.instance_id,
                    };
                    return Ok(self.interceptors.apply_response(response));
                }
                Err(error) => {
                    // A failed registry lookup is not a downstream failure;
                    // only real attempts feed the breaker.
                    if !matches!(error, Error::NoHealthyInstances { .. }) {
                        self.breaker.record_failure();
                        metrics::record_breaker_state(&self.service, self.breaker.state());
                    }

                    let retryable = self.is_retryable(&config, &error);
                    tracing::warn!(
                        service = %self.service,
                        correlation_id = %correlation_id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        retryable,
                        error = %error,
                        "Request attempt failed"
                    );

                    if !retryable || attempt == self.retry.max_attempts {
                        let elapsed = started.elapsed();
                        metrics::record_request(&self.service, "failure", elapsed);
                        let wrapped = Error::RetriesExhausted {
                            service: self.service.clone(),
                            attempts: attempt,
                            elapsed,
                            source: Box::new(error),
                        };
                        return Err(self.interceptors.apply_error(wrapped));
                    }

                    metrics::record_retry(&self.service);
                    time::sleep(retry_delay(&self.retry, attempt)).await;
                }
            }
        }

        // Unreachable with a validated config; max_attempts >= 1.
        Err(self
            .interceptors
            .apply_error(Error::InvalidRequest("retry policy allows zero attempts".into())))
    }

    fn is_retryable(&self, config: &RequestConfig, error: &Error) -> bool {
        match (error, config.retry_on_status) {
            (Error::Upstream { status, .. }, Some(classify)) => classify(*status),
            _ => error.is_retryable(),
        }
    }

    async fn attempt(
        &self,
        config: &RequestConfig,
        correlation_id: &str,
        timeout: Duration,
    ) -> Result<AttemptOutput> {
        let instance = self.registry.get_instance(&self.service)?;

        let url = format!(
            "{}://{}:{}{}{}",
            instance.protocol.scheme(),
            instance.host,
            instance.port,
            instance.base_path,
            config.path
        );

        let mut builder = self
            .http
            .request(config.method.clone(), url)
            .header(CORRELATION_HEADER, correlation_id)
            .header(REQUESTED_BY_HEADER, &self.caller)
            .header(PRIORITY_HEADER, config.priority.as_str());

        if !config.params.is_empty() {
            builder = builder.query(&config.params);
        }
        for (name, value) in &config.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &config.body {
            builder = builder.json(body);
        }

        let call = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };

        // The timeout drops the in-flight future, cancelling the call.
        let (status, headers, body) = time::timeout(timeout, call)
            .await
            .map_err(|_| Error::Timeout { service: self.service.clone(), timeout })?
            .map_err(|source| Error::Transport { service: self.service.clone(), source })?;

        if !(200..300).contains(&status) {
            return Err(Error::Upstream { service: self.service.clone(), status });
        }

        Ok(AttemptOutput { status, headers, body, instance_id: instance.id })
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service", &self.service)
            .field("caller", &self.caller)
            .field("retry", &self.retry)
            .finish()
    }
}
