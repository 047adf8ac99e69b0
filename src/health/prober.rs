//! Single-instance health probe.

use std::time::Duration;

use tokio::time;

use crate::registry::instance::{HealthStatus, InstanceSnapshot};

/// URL probed for one instance: `{protocol}://{host}:{port}{base_path}{path}`.
pub fn probe_url(instance: &InstanceSnapshot, path: &str) -> String {
    format!(
        "{}://{}:{}{}{}",
        instance.protocol.scheme(),
        instance.host,
        instance.port,
        instance.base_path,
        path
    )
}

/// Probe one instance's health endpoint. Pure function of the instance: the
/// verdict depends only on the response (or absence of one) within `timeout`.
pub async fn probe(
    client: &reqwest::Client,
    instance: &InstanceSnapshot,
    path: &str,
    timeout: Duration,
) -> HealthStatus {
    let url = probe_url(instance, path);

    let request = client
        .get(&url)
        .header("user-agent", "service-mesh-health-probe")
        .send();

    match time::timeout(timeout, request).await {
        Ok(Ok(response)) if response.status().is_success() => HealthStatus::Healthy,
        Ok(Ok(response)) => {
            tracing::warn!(
                instance_id = %instance.id,
                url = %url,
                status = %response.status(),
                "Health probe failed: non-success status"
            );
            HealthStatus::Unhealthy
        }
        Ok(Err(error)) => {
            tracing::warn!(
                instance_id = %instance.id,
                url = %url,
                error = %error,
                "Health probe failed: connection error"
            );
            HealthStatus::Unhealthy
        }
        Err(_) => {
            tracing::warn!(
                instance_id = %instance.id,
                url = %url,
                timeout_ms = timeout.as_millis() as u64,
                "Health probe failed: timeout"
            );
            HealthStatus::Unhealthy
        }
    }
}
