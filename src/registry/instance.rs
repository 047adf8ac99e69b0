//! Service instance representation.
//!
//! # Responsibilities
//! - Represent one running, addressable copy of a downstream service
//! - Track health state and last-probe timestamp (atomics, no locks on the
//!   read path)
//! - Hold the latest out-of-band load report for least-loaded selection

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

/// Health verdict for an instance.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthStatus::Healthy,
            2 => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Scheme an instance is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Out-of-band load report for one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    pub requests_per_second: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
}

/// Registration payload for [`crate::registry::ServiceRegistry::register`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Registration {
    /// Logical service name, e.g. `job-service`.
    pub service: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    /// Prefix prepended to every request path, e.g. `/api/v1`.
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Relative selection weight for the weighted strategy.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl Registration {
    /// Minimal registration with defaults for everything optional.
    pub fn new(service: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service: service.into(),
            host: host.into(),
            port,
            protocol: Protocol::default(),
            base_path: String::new(),
            version: None,
            zone: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
            weight: 1,
        }
    }
}

/// One registered instance. Identity and location are immutable; health and
/// load are interior-mutable so concurrent probes and selections never block
/// each other.
#[derive(Debug)]
pub struct ServiceInstance {
    pub id: String,
    pub service: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub base_path: String,
    pub version: Option<String>,
    pub zone: Option<String>,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, String>,
    pub weight: u32,

    /// Current health (see [`HealthStatus`] discriminants).
    health: AtomicU8,
    /// Epoch millis of the last health update; 0 = never checked.
    last_health_check_ms: AtomicU64,
    /// Epoch millis since the instance has been continuously unhealthy;
    /// 0 = not currently unhealthy.
    unhealthy_since_ms: AtomicU64,
    /// Latest load report, if any.
    load: RwLock<Option<LoadSample>>,
}

pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl ServiceInstance {
    pub(crate) fn from_registration(id: String, reg: Registration) -> Self {
        Self {
            id,
            service: reg.service,
            host: reg.host,
            port: reg.port,
            protocol: reg.protocol,
            base_path: reg.base_path,
            version: reg.version,
            zone: reg.zone,
            tags: reg.tags,
            metadata: reg.metadata,
            weight: reg.weight,
            health: AtomicU8::new(HealthStatus::Unknown as u8),
            last_health_check_ms: AtomicU64::new(0),
            unhealthy_since_ms: AtomicU64::new(0),
            load: RwLock::new(None),
        }
    }

    /// Current health status.
    pub fn health(&self) -> HealthStatus {
        self.health.load(Ordering::Relaxed).into()
    }

    /// Record a health verdict. Returns the previous status so the registry
    /// can emit transition events only on actual change.
    pub(crate) fn set_health(&self, status: HealthStatus) -> HealthStatus {
        let now = epoch_ms();
        self.last_health_check_ms.store(now, Ordering::Relaxed);
        let previous: HealthStatus =
            self.health.swap(status as u8, Ordering::Relaxed).into();

        match status {
            HealthStatus::Unhealthy => {
                // Stamp the start of the unhealthy streak once; keep it on
                // repeated unhealthy verdicts so eviction measures the full
                // continuous window.
                let _ = self.unhealthy_since_ms.compare_exchange(
                    0,
                    now,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                );
            }
            _ => self.unhealthy_since_ms.store(0, Ordering::Relaxed),
        }
        previous
    }

    /// How long this instance has been continuously unhealthy.
    pub(crate) fn unhealthy_for(&self) -> Option<Duration> {
        let since = self.unhealthy_since_ms.load(Ordering::Relaxed);
        if since == 0 {
            return None;
        }
        Some(Duration::from_millis(epoch_ms().saturating_sub(since)))
    }

    /// Latest load report, if one has been submitted.
    pub fn load(&self) -> Option<LoadSample> {
        *self.load.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_load(&self, sample: LoadSample) {
        *self.load.write().unwrap_or_else(|e| e.into_inner()) = Some(sample);
    }

    /// Reported requests-per-second; missing report counts as zero, which
    /// makes fresh instances preferred by the least-loaded strategy.
    pub fn requests_per_second(&self) -> f64 {
        self.load().map(|l| l.requests_per_second).unwrap_or(0.0)
    }

    /// Base URL for this instance: `{protocol}://{host}:{port}{base_path}`.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}://{}:{}{}",
            self.protocol.scheme(),
            self.host,
            self.port,
            self.base_path
        ))
    }

    /// Point-in-time copy handed across component boundaries.
    pub fn snapshot(&self) -> InstanceSnapshot {
        let last = self.last_health_check_ms.load(Ordering::Relaxed);
        InstanceSnapshot {
            id: self.id.clone(),
            service: self.service.clone(),
            host: self.host.clone(),
            port: self.port,
            protocol: self.protocol,
            base_path: self.base_path.clone(),
            version: self.version.clone(),
            zone: self.zone.clone(),
            weight: self.weight,
            health: self.health(),
            last_health_check: (last > 0)
                .then(|| UNIX_EPOCH + Duration::from_millis(last)),
            load: self.load(),
        }
    }
}

/// Immutable copy of an instance's observable state. This is what leaves the
/// registry; callers never hold references into the live table.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot {
    pub id: String,
    pub service: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub base_path: String,
    pub version: Option<String>,
    pub zone: Option<String>,
    pub weight: u32,
    pub health: HealthStatus,
    #[serde(skip)]
    pub last_health_check: Option<SystemTime>,
    pub load: Option<LoadSample>,
}

impl InstanceSnapshot {
    /// Base URL for this instance: `{protocol}://{host}:{port}{base_path}`.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}://{}:{}{}",
            self.protocol.scheme(),
            self.host,
            self.port,
            self.base_path
        ))
    }
}
