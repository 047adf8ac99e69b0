//! Weighted random selection strategy.

use std::sync::Arc;

use rand::Rng;

use crate::load_balancer::Strategy;
use crate::registry::instance::ServiceInstance;

/// Picks with probability proportional to each instance's weight using a
/// cumulative sum over a uniform draw. Instances with `weight == 0` are never
/// selected; if every weight is zero, falls back to a uniform pick.
#[derive(Debug, Default)]
pub struct Weighted;

impl Weighted {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Weighted {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>> {
        if instances.is_empty() {
            return None;
        }

        let total: u64 = instances.iter().map(|i| u64::from(i.weight)).sum();
        if total == 0 {
            let index = rand::thread_rng().gen_range(0..instances.len());
            return Some(instances[index].clone());
        }

        let mut draw = rand::thread_rng().gen_range(0..total);
        for instance in instances {
            let weight = u64::from(instance.weight);
            if draw < weight {
                return Some(instance.clone());
            }
            draw -= weight;
        }
        // Unreachable: draw < total and the cumulative sum covers total.
        instances.last().cloned()
    }
}
