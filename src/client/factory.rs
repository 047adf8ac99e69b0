//! Process-wide client cache.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::client::interceptor::{Interceptor, InterceptorChain};
use crate::client::ServiceClient;
use crate::config::{CircuitBreakerConfig, MeshConfig, RetryPolicy};
use crate::registry::ServiceRegistry;
use crate::resilience::{BreakerSnapshot, BreakerState};

/// Per-client overrides of the factory defaults.
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub retry: Option<RetryPolicy>,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub interceptors: Vec<Arc<dyn Interceptor>>,
}

/// Memoizes one [`ServiceClient`] per downstream service name, sharing the
/// registry, the HTTP connection pool, and the default retry/breaker
/// configuration.
pub struct ClientFactory {
    registry: Arc<ServiceRegistry>,
    caller: String,
    retry: RetryPolicy,
    circuit_breaker: CircuitBreakerConfig,
    http: reqwest::Client,
    clients: DashMap<String, Arc<ServiceClient>>,
}

impl ClientFactory {
    pub fn new(registry: Arc<ServiceRegistry>, config: &MeshConfig) -> Self {
        Self {
            registry,
            caller: config.caller.name.clone(),
            retry: config.retry,
            circuit_breaker: config.circuit_breaker,
            http: crate::client::direct_http_client(),
            clients: DashMap::new(),
        }
    }

    /// Get or create the client for a downstream service with the process
    /// defaults.
    pub fn client(&self, service: &str) -> Arc<ServiceClient> {
        self.client_with(service, ClientOptions::default())
    }

    /// Get or create the client for a downstream service. On the first call
    /// for a given name the options are merged with the defaults and stick
    /// for the process lifetime; later callers get the existing client and
    /// their options are ignored.
    pub fn client_with(&self, service: &str, options: ClientOptions) -> Arc<ServiceClient> {
        self.clients
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(service = %service, "Creating service client");
                Arc::new(ServiceClient::new(
                    service,
                    self.caller.clone(),
                    self.registry.clone(),
                    self.http.clone(),
                    options.retry.unwrap_or(self.retry),
                    options.circuit_breaker.unwrap_or(self.circuit_breaker),
                    InterceptorChain::new(options.interceptors),
                ))
            })
            .clone()
    }

    /// Aggregate breaker snapshot across every client created so far.
    pub fn breaker_states(&self) -> HashMap<String, BreakerSnapshot> {
        self.clients
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().breaker_snapshot()))
            .collect()
    }

    /// True when no breaker is currently open.
    pub fn healthy(&self) -> bool {
        self.clients
            .iter()
            .all(|entry| entry.value().breaker_snapshot().state != BreakerState::Open)
    }

    /// Administrative reset of every breaker, for operational recovery.
    pub fn reset_breakers(&self) {
        for entry in self.clients.iter() {
            entry.value().reset_breaker();
        }
        tracing::info!(count = self.clients.len(), "All circuit breakers reset");
    }

    /// Registry shared by all clients of this factory.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("caller", &self.caller)
            .field("clients", &self.clients.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> ClientFactory {
        ClientFactory::new(Arc::new(ServiceRegistry::default()), &MeshConfig::default())
    }

    #[test]
    fn clients_are_memoized_per_service() {
        let factory = factory();
        let a = factory.client("jobs");
        let b = factory.client("jobs");
        assert!(Arc::ptr_eq(&a, &b));

        let c = factory.client("users");
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn first_callers_options_win() {
        let factory = factory();
        let strict = ClientOptions {
            retry: Some(RetryPolicy { max_attempts: 7, ..Default::default() }),
            ..Default::default()
        };
        let first = factory.client_with("jobs", strict);

        // Second caller's options are ignored.
        let loose = ClientOptions {
            retry: Some(RetryPolicy { max_attempts: 1, ..Default::default() }),
            ..Default::default()
        };
        let second = factory.client_with("jobs", loose);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn breaker_states_cover_all_clients() {
        let factory = factory();
        factory.client("jobs");
        factory.client("users");

        let states = factory.breaker_states();
        assert_eq!(states.len(), 2);
        assert!(states.values().all(|s| s.state == BreakerState::Closed));
        assert!(factory.healthy());
    }
}
