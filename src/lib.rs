//! Client-side service discovery and resilient inter-service communication.
//!
//! An in-process runtime for processes that call other services: a registry
//! of live instances with periodic health probing, load-balanced instance
//! selection, per-downstream circuit breakers, and a retrying HTTP client
//! with request correlation and metrics.

// Core subsystems
pub mod config;
pub mod error;
pub mod registry;

// Traffic management
pub mod health;
pub mod load_balancer;

// Calling side
pub mod client;
pub mod resilience;

// Cross-cutting concerns
pub mod observability;
pub mod runtime;

pub use client::{
    ClientFactory, ClientOptions, Interceptor, Priority, RequestConfig, ServiceClient,
    ServiceResponse,
};
pub use config::MeshConfig;
pub use error::{Error, Result};
pub use health::HealthMonitor;
pub use registry::{HealthStatus, LoadSample, Registration, ServiceRegistry};
pub use resilience::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use runtime::Mesh;
