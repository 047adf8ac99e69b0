//! The authoritative in-memory instance table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::load_balancer::{make_strategy, Strategy};
use crate::observability::metrics;
use crate::registry::instance::{
    HealthStatus, InstanceSnapshot, LoadSample, Registration, ServiceInstance,
};

/// Notifications emitted on registry mutations. Intended for alerting hooks;
/// correctness never depends on anyone listening.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Registered { service: String, instance_id: String },
    Deregistered { service: String, instance_id: String },
    HealthChanged {
        service: String,
        instance_id: String,
        from: HealthStatus,
        to: HealthStatus,
    },
    Evicted { service: String, instance_id: String },
}

/// Per-service counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ServiceStats {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

/// Snapshot of the whole registry for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub services: HashMap<String, ServiceStats>,
}

#[derive(Debug)]
struct ServiceGroup {
    instances: Vec<Arc<ServiceInstance>>,
    balancer: Box<dyn Strategy>,
}

/// In-memory table of instances per logical service name. Explicitly
/// constructed and injected; one process can run several independent
/// registries (e.g. in tests).
#[derive(Debug)]
pub struct ServiceRegistry {
    services: DashMap<String, ServiceGroup>,
    config: RegistryConfig,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ServiceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { services: DashMap::new(), config, events }
    }

    /// Subscribe to mutation events (health transitions, evictions).
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn strategy_for(&self, service: &str) -> Box<dyn Strategy> {
        let kind = self
            .config
            .strategies
            .get(service)
            .copied()
            .unwrap_or(self.config.default_strategy);
        make_strategy(kind)
    }

    /// Register or re-register an instance. Upserts by `(service, host, port)`;
    /// re-registration replaces the entry but keeps the existing instance id.
    /// Health always starts at `Unknown` until the first probe.
    pub fn register(&self, registration: Registration) -> String {
        let service = registration.service.clone();
        let mut group = self
            .services
            .entry(service.clone())
            .or_insert_with(|| ServiceGroup {
                instances: Vec::new(),
                balancer: self.strategy_for(&service),
            });

        let existing = group
            .instances
            .iter()
            .position(|i| i.host == registration.host && i.port == registration.port);

        let id = match existing {
            Some(index) => group.instances[index].id.clone(),
            None => Uuid::new_v4().to_string(),
        };

        let instance =
            Arc::new(ServiceInstance::from_registration(id.clone(), registration));

        match existing {
            Some(index) => group.instances[index] = instance,
            None => group.instances.push(instance),
        }

        tracing::info!(
            service = %service,
            instance_id = %id,
            replaced = existing.is_some(),
            total = group.instances.len(),
            "Instance registered"
        );
        drop(group);

        metrics::record_registry_size(&self.stats());
        self.emit(RegistryEvent::Registered { service, instance_id: id.clone() });
        id
    }

    /// Remove an instance. Returns false when the instance was not present.
    pub fn unregister(&self, service: &str, instance_id: &str) -> bool {
        let removed = match self.services.get_mut(service) {
            Some(mut group) => {
                let before = group.instances.len();
                group.instances.retain(|i| i.id != instance_id);
                before != group.instances.len()
            }
            None => return false,
        };

        if removed {
            self.services.remove_if(service, |_, group| group.instances.is_empty());
            tracing::info!(service = %service, instance_id = %instance_id, "Instance unregistered");
            metrics::record_registry_size(&self.stats());
            self.emit(RegistryEvent::Deregistered {
                service: service.to_string(),
                instance_id: instance_id.to_string(),
            });
        }
        removed
    }

    /// Select one healthy instance for the service via its configured
    /// strategy. Unknown service names and services with no healthy instance
    /// both fail with [`Error::NoHealthyInstances`].
    pub fn get_instance(&self, service: &str) -> Result<InstanceSnapshot> {
        let group = self
            .services
            .get(service)
            .ok_or_else(|| Error::NoHealthyInstances { service: service.to_string() })?;

        let healthy: Vec<Arc<ServiceInstance>> = group
            .instances
            .iter()
            .filter(|i| i.health() == HealthStatus::Healthy)
            .cloned()
            .collect();

        if healthy.is_empty() {
            return Err(Error::NoHealthyInstances { service: service.to_string() });
        }

        group
            .balancer
            .select(&healthy)
            .map(|i| i.snapshot())
            .ok_or_else(|| Error::NoHealthyInstances { service: service.to_string() })
    }

    /// Unfiltered snapshot of one service's instances, for diagnostics.
    pub fn get_all_instances(&self, service: &str) -> Vec<InstanceSnapshot> {
        self.services
            .get(service)
            .map(|group| group.instances.iter().map(|i| i.snapshot()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of every instance across all services, for the health monitor.
    pub fn all_instances(&self) -> Vec<InstanceSnapshot> {
        self.services
            .iter()
            .flat_map(|entry| {
                entry.value().instances.iter().map(|i| i.snapshot()).collect::<Vec<_>>()
            })
            .collect()
    }

    /// Record a health verdict. Idempotent; stamps the last-check timestamp
    /// either way and emits a transition event only when the status actually
    /// changed.
    pub fn update_health(&self, service: &str, instance_id: &str, status: HealthStatus) {
        let Some(group) = self.services.get(service) else { return };
        let Some(instance) = group.instances.iter().find(|i| i.id == instance_id).cloned()
        else {
            return;
        };
        drop(group);

        let previous = instance.set_health(status);

        if previous != status {
            tracing::info!(
                service = %service,
                instance_id = %instance_id,
                from = %previous,
                to = %status,
                "Instance health transition"
            );
            metrics::record_registry_size(&self.stats());
            self.emit(RegistryEvent::HealthChanged {
                service: service.to_string(),
                instance_id: instance_id.to_string(),
                from: previous,
                to: status,
            });
        }
    }

    /// Best-effort load report. An unknown instance id is a silent no-op.
    pub fn update_load(&self, service: &str, instance_id: &str, sample: LoadSample) {
        if let Some(group) = self.services.get(service) {
            if let Some(instance) = group.instances.iter().find(|i| i.id == instance_id) {
                instance.set_load(sample);
            }
        }
    }

    /// Remove every instance that has been continuously unhealthy for longer
    /// than `window`. Returns the evicted `(service, instance_id)` pairs.
    pub fn evict_expired(&self, window: Duration) -> Vec<(String, String)> {
        let mut evicted = Vec::new();

        for mut entry in self.services.iter_mut() {
            let service = entry.key().clone();
            entry.value_mut().instances.retain(|instance| {
                match instance.unhealthy_for() {
                    Some(streak) if streak > window => {
                        evicted.push((service.clone(), instance.id.clone()));
                        false
                    }
                    _ => true,
                }
            });
        }
        self.services.retain(|_, group| !group.instances.is_empty());

        for (service, instance_id) in &evicted {
            tracing::warn!(
                service = %service,
                instance_id = %instance_id,
                window_ms = window.as_millis() as u64,
                "Evicting instance stuck unhealthy"
            );
            self.emit(RegistryEvent::Evicted {
                service: service.clone(),
                instance_id: instance_id.clone(),
            });
        }
        if !evicted.is_empty() {
            metrics::record_registry_size(&self.stats());
        }
        evicted
    }

    /// Per-service instance counts for diagnostics.
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.services.iter() {
            let mut counts = ServiceStats::default();
            for instance in &entry.value().instances {
                counts.total += 1;
                match instance.health() {
                    HealthStatus::Healthy => counts.healthy += 1,
                    HealthStatus::Unhealthy => counts.unhealthy += 1,
                    HealthStatus::Unknown => counts.unknown += 1,
                }
            }
            stats.services.insert(entry.key().clone(), counts);
        }
        stats
    }
}
