//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::Strategy;
use crate::registry::instance::ServiceInstance;

/// Round-robin selector with a per-service monotonically increasing cursor.
/// `fetch_add` makes the rotation safe under concurrent selection: no two
/// concurrent calls observe the same cursor value.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for RoundRobin {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>> {
        if instances.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % instances.len();
        Some(instances[index].clone())
    }
}
