//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured, correlation id attached by the client)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log subscriber installed by the embedding process
//!     → Prometheus scrape endpoint (optional, init_metrics)
//! ```
//!
//! # Design Decisions
//! - The library never installs a global tracing subscriber
//! - Metric updates are cheap (atomic increments behind the metrics facade)
//! - Labels: service name, outcome, health; never per-request values

pub mod metrics;
