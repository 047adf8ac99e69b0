//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the runtime.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service-mesh runtime.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MeshConfig {
    /// Identity of the calling service, propagated as `x-requested-by`.
    pub caller: CallerConfig,

    /// Registry and instance-selection settings.
    pub registry: RegistryConfig,

    /// Active health probing settings.
    pub health_check: HealthCheckConfig,

    /// Retry policy applied by clients.
    pub retry: RetryPolicy,

    /// Circuit-breaker settings applied per downstream service.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Identity of the process embedding this runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CallerConfig {
    /// Service name attached to outbound requests.
    pub name: String,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self { name: "unknown".to_string() }
    }
}

/// Load-balancing strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    RoundRobin,
    Random,
    /// Lowest reported requests-per-second wins; a missing load sample
    /// counts as zero.
    #[serde(alias = "least-connections")]
    LeastLoaded,
    Weighted,
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// Strategy used for services without an explicit override.
    pub default_strategy: StrategyKind,

    /// Per-service strategy overrides, keyed by service name.
    pub strategies: HashMap<String, StrategyKind>,
}

/// Active health-check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic health monitor.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path probed on each instance, relative to its base path.
    pub path: String,

    /// Number of intervals an instance may stay unhealthy before eviction.
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 5,
            path: "/health".to_string(),
            unhealthy_threshold: 3,
        }
    }
}

impl HealthCheckConfig {
    /// Probe interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Per-probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// How long an instance may remain continuously unhealthy before the
    /// registry evicts it.
    pub fn eviction_window(&self) -> Duration {
        self.interval() * self.unhealthy_threshold
    }
}

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
        }
    }
}

/// Circuit-breaker configuration, one breaker per downstream service.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// How long the breaker stays open before allowing a trial call, in
    /// milliseconds.
    pub reset_timeout_ms: u64,

    /// Hard deadline for a single request attempt, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout_ms: 30_000,
            request_timeout_ms: 5_000,
        }
    }
}

impl CircuitBreakerConfig {
    /// Reset timeout as a [`Duration`].
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Address the metrics endpoint binds to.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MeshConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, 1_000);
        assert_eq!(config.retry.max_delay_ms, 10_000);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.health_check.interval_secs, 30);
        assert_eq!(config.health_check.path, "/health");
    }

    #[test]
    fn eviction_window_is_threshold_times_interval() {
        let hc = HealthCheckConfig {
            interval_secs: 10,
            unhealthy_threshold: 3,
            ..Default::default()
        };
        assert_eq!(hc.eviction_window(), Duration::from_secs(30));
    }

    #[test]
    fn strategy_kind_parses_kebab_case_and_alias() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: StrategyKind,
        }
        let w: Wrapper = toml::from_str(r#"strategy = "least-loaded""#).unwrap();
        assert_eq!(w.strategy, StrategyKind::LeastLoaded);
        let w: Wrapper = toml::from_str(r#"strategy = "least-connections""#).unwrap();
        assert_eq!(w.strategy, StrategyKind::LeastLoaded);
        let w: Wrapper = toml::from_str(r#"strategy = "round-robin""#).unwrap();
        assert_eq!(w.strategy, StrategyKind::RoundRobin);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: MeshConfig = toml::from_str(
            r#"
            [caller]
            name = "job-service"

            [circuit_breaker]
            failure_threshold = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.caller.name, "job-service");
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.reset_timeout_ms, 30_000);
        assert_eq!(config.retry.max_attempts, 3);
    }
}
