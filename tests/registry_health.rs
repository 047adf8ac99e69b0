//! Health monitor integration tests against real sockets.

use std::sync::Arc;
use std::time::Duration;

use service_mesh::config::HealthCheckConfig;
use service_mesh::health::HealthMonitor;
use service_mesh::registry::{HealthStatus, Registration, ServiceRegistry};

mod common;

fn monitor_config(interval_secs: u64, unhealthy_threshold: u32) -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: true,
        interval_secs,
        timeout_secs: 1,
        path: "/health".to_string(),
        unhealthy_threshold,
    }
}

#[tokio::test]
async fn probes_classify_live_and_dead_instances() {
    common::init_logging();
    let live = common::start_healthy_backend("{\"status\":\"ok\"}").await;
    let dead = common::dead_addr().await;

    let registry = Arc::new(ServiceRegistry::default());
    let live_id =
        registry.register(Registration::new("jobs", live.ip().to_string(), live.port()));
    let dead_id =
        registry.register(Registration::new("jobs", dead.ip().to_string(), dead.port()));

    let monitor = HealthMonitor::new(registry.clone(), monitor_config(30, 3));
    monitor.check_all().await;

    let all = registry.get_all_instances("jobs");
    let health_of = |id: &str| all.iter().find(|i| i.id == *id).unwrap().health;
    assert_eq!(health_of(&live_id), HealthStatus::Healthy);
    assert_eq!(health_of(&dead_id), HealthStatus::Unhealthy);

    // Only the live instance is eligible for traffic.
    for _ in 0..10 {
        assert_eq!(registry.get_instance("jobs").unwrap().id, live_id);
    }

    let stats = registry.stats();
    let jobs = stats.services["jobs"];
    assert_eq!((jobs.total, jobs.healthy, jobs.unhealthy), (2, 1, 1));
}

#[tokio::test]
async fn non_success_status_is_unhealthy() {
    let addr = common::start_backend(|head| async move {
        match common::request_path(&head).as_str() {
            "/health" => (503, "overloaded".to_string()),
            _ => (200, "{}".to_string()),
        }
    })
    .await;

    let registry = Arc::new(ServiceRegistry::default());
    let id = registry.register(Registration::new("jobs", addr.ip().to_string(), addr.port()));

    let monitor = HealthMonitor::new(registry.clone(), monitor_config(30, 3));
    monitor.check_all().await;

    assert_eq!(registry.get_all_instances("jobs")[0].health, HealthStatus::Unhealthy);
    assert!(registry.get_instance("jobs").is_err());
    let _ = id;
}

#[tokio::test]
async fn probe_honors_the_instance_base_path() {
    let addr = common::start_backend(|head| async move {
        match common::request_path(&head).as_str() {
            "/api/v1/health" => (200, "{}".to_string()),
            _ => (404, "not here".to_string()),
        }
    })
    .await;

    let registry = Arc::new(ServiceRegistry::default());
    let mut reg = Registration::new("jobs", addr.ip().to_string(), addr.port());
    reg.base_path = "/api/v1".to_string();
    registry.register(reg);

    let monitor = HealthMonitor::new(registry.clone(), monitor_config(30, 3));
    monitor.check_all().await;

    assert_eq!(registry.get_all_instances("jobs")[0].health, HealthStatus::Healthy);
}

#[tokio::test]
async fn slow_probe_does_not_delay_the_others() {
    let slow = common::start_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "{}".to_string())
    })
    .await;
    let fast = common::start_healthy_backend("{}").await;

    let registry = Arc::new(ServiceRegistry::default());
    registry.register(Registration::new("jobs", slow.ip().to_string(), slow.port()));
    let fast_id =
        registry.register(Registration::new("jobs", fast.ip().to_string(), fast.port()));

    // Probe timeout is 1s; the whole tick must finish in roughly that bound,
    // not the 5s the slow instance would take.
    let monitor = HealthMonitor::new(registry.clone(), monitor_config(30, 3));
    let started = std::time::Instant::now();
    monitor.check_all().await;
    assert!(started.elapsed() < Duration::from_secs(3));

    let all = registry.get_all_instances("jobs");
    let health_of = |id: &str| all.iter().find(|i| i.id == *id).unwrap().health;
    assert_eq!(health_of(&fast_id), HealthStatus::Healthy);
}

#[tokio::test]
async fn instances_stuck_unhealthy_are_evicted() {
    let dead = common::dead_addr().await;

    let registry = Arc::new(ServiceRegistry::default());
    let id = registry.register(Registration::new("jobs", dead.ip().to_string(), dead.port()));

    // Window = interval × threshold = 1s.
    let monitor = HealthMonitor::new(registry.clone(), monitor_config(1, 1));

    monitor.check_all().await;
    assert_eq!(registry.get_all_instances("jobs").len(), 1, "marked, not yet evicted");

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    monitor.check_all().await;

    assert!(registry.get_all_instances("jobs").is_empty(), "evicted after the window");
    let _ = id;
}
