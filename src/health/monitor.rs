//! Periodic health monitor task.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::prober;
use crate::observability::metrics;
use crate::registry::instance::HealthStatus;
use crate::registry::ServiceRegistry;

/// Probes every registered instance on a fixed interval and feeds the
/// verdicts back into the registry. Runs until the shutdown channel fires.
pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ServiceRegistry>, config: HealthCheckConfig) -> Self {
        Self { registry, config, client: crate::client::direct_http_client() }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            timeout_secs = self.config.timeout_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every instance concurrently, apply the verdicts, then evict
    /// instances stuck unhealthy past the configured window. The tick takes
    /// as long as the slowest probe, bounded by the probe timeout.
    pub async fn check_all(&self) {
        let instances = self.registry.all_instances();
        if instances.is_empty() {
            return;
        }

        let timeout = self.config.probe_timeout();
        let probes = instances.iter().map(|instance| {
            let client = &self.client;
            let path = &self.config.path;
            async move {
                let verdict = prober::probe(client, instance, path, timeout).await;
                (instance, verdict)
            }
        });

        for (instance, verdict) in join_all(probes).await {
            if verdict == HealthStatus::Unhealthy {
                metrics::record_probe_failure(&instance.service);
            }
            self.registry.update_health(&instance.service, &instance.id, verdict);
        }

        let evicted = self.registry.evict_expired(self.config.eviction_window());
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "Evicted unhealthy instances");
        }
    }
}
