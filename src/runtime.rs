//! Top-level wiring: one [`Mesh`] owns the registry, the client factory, and
//! the health monitor's lifecycle. Explicitly constructed and injectable;
//! a process can run several independent meshes (e.g. in tests).

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::client::ClientFactory;
use crate::config::loader::{load_config, ConfigError};
use crate::config::MeshConfig;
use crate::health::HealthMonitor;
use crate::observability::metrics;
use crate::registry::{RegistryStats, ServiceRegistry};

/// The assembled runtime.
pub struct Mesh {
    config: MeshConfig,
    registry: Arc<ServiceRegistry>,
    factory: ClientFactory,
    shutdown: broadcast::Sender<()>,
}

impl Mesh {
    pub fn new(config: MeshConfig) -> Self {
        let registry = Arc::new(ServiceRegistry::new(config.registry.clone()));
        let factory = ClientFactory::new(registry.clone(), &config);
        let (shutdown, _) = broadcast::channel(1);
        Self { config, registry, factory, shutdown }
    }

    /// Load, validate, and assemble from a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(load_config(path)?))
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    pub fn factory(&self) -> &ClientFactory {
        &self.factory
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Diagnostics: per-service instance counts.
    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Install the Prometheus exporter when enabled in config.
    pub fn init_metrics(&self) {
        if !self.config.observability.metrics_enabled {
            return;
        }
        match self.config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %self.config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    /// Spawn the periodic health monitor. It runs until [`Mesh::shutdown`].
    pub fn spawn_health_monitor(&self) -> JoinHandle<()> {
        let monitor =
            HealthMonitor::new(self.registry.clone(), self.config.health_check.clone());
        tokio::spawn(monitor.run(self.shutdown.subscribe()))
    }

    /// Stop background tasks.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn health_monitor_stops_on_shutdown() {
        let mesh = Mesh::new(MeshConfig::default());
        let handle = mesh.spawn_health_monitor();

        mesh.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should exit promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn disabled_monitor_exits_immediately() {
        let mut config = MeshConfig::default();
        config.health_check.enabled = false;
        let mesh = Mesh::new(config);

        let handle = mesh.spawn_health_monitor();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("disabled monitor should return")
            .unwrap();
    }
}
