//! Least-loaded selection strategy (alias: least-connections).

use std::sync::Arc;

use crate::load_balancer::Strategy;
use crate::registry::instance::ServiceInstance;

/// Selects the instance with the lowest reported requests-per-second.
/// Instances without a load report count as 0.0 and are therefore preferred.
/// In case of tie, the first one is selected (stability).
#[derive(Debug, Default)]
pub struct LeastLoaded;

impl LeastLoaded {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LeastLoaded {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>> {
        instances
            .iter()
            .min_by(|a, b| a.requests_per_second().total_cmp(&b.requests_per_second()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_util::instance;
    use crate::registry::instance::LoadSample;

    fn sample(rps: f64) -> LoadSample {
        LoadSample { requests_per_second: rps, cpu_usage: 0.0, memory_usage: 0.0 }
    }

    #[test]
    fn picks_lowest_reported_rps() {
        let lb = LeastLoaded::new();
        let a = instance(4001);
        let b = instance(4002);
        a.set_load(sample(80.0));
        b.set_load(sample(12.5));

        let picked = lb.select(&[a, b.clone()]).unwrap();
        assert_eq!(picked.port, b.port);
    }

    #[test]
    fn missing_report_is_preferred_over_any_load() {
        let lb = LeastLoaded::new();
        let a = instance(4001);
        let b = instance(4002);
        a.set_load(sample(0.1));

        let picked = lb.select(&[a, b.clone()]).unwrap();
        assert_eq!(picked.port, b.port);
    }

    #[test]
    fn tie_goes_to_first() {
        let lb = LeastLoaded::new();
        let a = instance(4001);
        let b = instance(4002);

        let picked = lb.select(&[a.clone(), b]).unwrap();
        assert_eq!(picked.port, a.port);
    }

    #[test]
    fn empty_slice_yields_none() {
        assert!(LeastLoaded::new().select(&[]).is_none());
    }
}
