//! Uniform random selection strategy.

use std::sync::Arc;

use rand::Rng;

use crate::load_balancer::Strategy;
use crate::registry::instance::ServiceInstance;

/// Uniform pick among healthy instances.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Random {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>> {
        if instances.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..instances.len());
        Some(instances[index].clone())
    }
}
