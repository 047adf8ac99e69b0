//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to a downstream service:
//!     → circuit_breaker.rs (gate: can_execute before any network attempt)
//!     → attempt executes under its hard timeout
//!     → outcome recorded back (record_success / record_failure)
//!     → on retryable failure: backoff.rs computes the sleep before the
//!       next attempt
//! ```
//!
//! # Design Decisions
//! - One breaker per downstream service name, not per physical instance
//! - Gating and state transitions are atomic under a single mutex
//! - Backoff is deterministic; the delay sequence is part of the contract

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::retry_delay;
pub use circuit_breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
