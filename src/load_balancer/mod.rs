//! Instance selection subsystem.
//!
//! # Data Flow
//! ```text
//! Registry resolves service name → healthy instances
//!     → Apply the configured strategy:
//!         - round_robin.rs (rotate through instances)
//!         - random.rs (uniform pick)
//!         - least_loaded.rs (lowest reported requests/sec)
//!         - weighted.rs (probability proportional to weight)
//!     → Return selected instance or None
//! ```
//!
//! # Design Decisions
//! - Strategies are pure selection over an already-filtered healthy slice;
//!   the registry owns filtering and snapshotting
//! - One strategy value per service, so round-robin cursors are per-service
//! - Cursors use atomics; concurrent selections never corrupt the rotation

use std::sync::Arc;

use crate::config::StrategyKind;
use crate::registry::instance::ServiceInstance;

pub mod least_loaded;
pub mod random;
pub mod round_robin;
pub mod weighted;

pub use least_loaded::LeastLoaded;
pub use random::Random;
pub use round_robin::RoundRobin;
pub use weighted::Weighted;

/// A load-balancing strategy. `instances` is a non-empty slice of healthy
/// instances of a single service; implementations return `None` only for an
/// empty slice.
pub trait Strategy: Send + Sync + std::fmt::Debug {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>>;
}

/// Construct the strategy for a service from its configured kind.
pub fn make_strategy(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
        StrategyKind::Random => Box::new(Random::new()),
        StrategyKind::LeastLoaded => Box::new(LeastLoaded::new()),
        StrategyKind::Weighted => Box::new(Weighted::new()),
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::registry::instance::Registration;

    /// Build a healthy test instance on the given port.
    pub fn instance(port: u16) -> Arc<ServiceInstance> {
        Arc::new(ServiceInstance::from_registration(
            format!("i-{port}"),
            Registration::new("test", "127.0.0.1", port),
        ))
    }

    /// Build a healthy test instance with an explicit weight.
    pub fn weighted_instance(port: u16, weight: u32) -> Arc<ServiceInstance> {
        let mut reg = Registration::new("test", "127.0.0.1", port);
        reg.weight = weight;
        Arc::new(ServiceInstance::from_registration(format!("i-{port}"), reg))
    }
}
