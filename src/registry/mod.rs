//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! register / unregister / update_health / update_load
//!     → instance.rs (per-instance state, atomics)
//!     → service.rs (authoritative table, DashMap keyed by service name)
//!
//! get_instance(service)
//!     → filter healthy → load_balancer strategy → InstanceSnapshot
//!
//! Health monitor tick
//!     → update_health per probe result
//!     → evict_expired(window) removes instances stuck unhealthy
//! ```
//!
//! # Design Decisions
//! - The registry exclusively owns instance lifetime; everything handed out
//!   is a snapshot copy
//! - Health transitions are observable via a broadcast event stream
//! - Eviction is driven by the health monitor, not an internal timer

pub mod instance;
pub mod service;

pub use instance::{
    HealthStatus, InstanceSnapshot, LoadSample, Protocol, Registration, ServiceInstance,
};
pub use service::{RegistryEvent, RegistryStats, ServiceRegistry, ServiceStats};
