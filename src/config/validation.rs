//! Configuration validation.
//!
//! Serde handles syntactic validation; this module performs the semantic
//! checks (value ranges, address parseability). All errors are collected and
//! returned together rather than failing on the first.

use std::fmt;

use crate::config::schema::MeshConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `retry.max_attempts`.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &MeshConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }
    if config.retry.backoff_factor < 1.0 {
        errors.push(ValidationError::new("retry.backoff_factor", "must be >= 1.0"));
    }
    if config.retry.initial_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.initial_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.failure_threshold", "must be at least 1"));
    }
    if config.circuit_breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.reset_timeout_ms", "must be positive"));
    }
    if config.circuit_breaker.request_timeout_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.request_timeout_ms", "must be positive"));
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be positive"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::new("health_check.timeout_secs", "must be positive"));
    }
    if config.health_check.unhealthy_threshold == 0 {
        errors.push(ValidationError::new("health_check.unhealthy_threshold", "must be at least 1"));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
