//! Circuit breaker for downstream service protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: downstream assumed down, requests fail fast
//! - Half-Open: trial period after the reset timeout
//!
//! # State Transitions
//! ```text
//! Closed → Open:      failure_count reaches threshold
//! Open → Half-Open:   can_execute() called after next_attempt (lazy)
//! Half-Open → Closed: recorded success
//! Half-Open → Open:   recorded failure (next_attempt pushed forward)
//! Any → Closed:       a single recorded success fully closes the breaker
//! ```
//!
//! # Design Decisions
//! - One breaker per downstream service name, shared by all callers
//! - All checks and transitions happen under one mutex, so two racing
//!   callers can never both perform the Open→Half-Open transition
//! - Half-Open does not cap concurrent trial calls (matches the documented
//!   contract: any call during the trial period is allowed)

use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

use crate::config::CircuitBreakerConfig;

/// Breaker state as seen by callers and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "CLOSED"),
            BreakerState::Open => write!(f, "OPEN"),
            BreakerState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Diagnostic snapshot of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub service: String,
    pub state: BreakerState,
    pub failure_count: u32,
    #[serde(skip)]
    pub last_failure: Option<SystemTime>,
    #[serde(skip)]
    pub next_attempt: Option<SystemTime>,
}

#[derive(Debug)]
struct Core {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    next_attempt: Option<Instant>,
}

/// Per-downstream-service circuit breaker. Created lazily on first use and
/// lives for the process lifetime.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    config: CircuitBreakerConfig,
    core: Mutex<Core>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            core: Mutex::new(Core {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
                next_attempt: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gate a request attempt. Returns false only while Open and before the
    /// reset timeout; an expired Open breaker transitions to Half-Open as a
    /// side effect and lets the call through.
    pub fn can_execute(&self) -> bool {
        let mut core = self.lock();
        match core.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let expired = core
                    .next_attempt
                    .map(|at| Instant::now() >= at)
                    .unwrap_or(true);
                if expired {
                    core.state = BreakerState::HalfOpen;
                    tracing::info!(service = %self.service, "Circuit breaker half-open, allowing trial calls");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call. A single success from any state fully
    /// closes the breaker and zeroes the failure count.
    pub fn record_success(&self) {
        let mut core = self.lock();
        if core.state != BreakerState::Closed {
            tracing::info!(service = %self.service, from = %core.state, "Circuit breaker closed");
        }
        core.state = BreakerState::Closed;
        core.failure_count = 0;
        core.next_attempt = None;
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut core = self.lock();
        let now = Instant::now();
        core.last_failure = Some(now);
        core.failure_count += 1;

        match core.state {
            BreakerState::HalfOpen => {
                core.state = BreakerState::Open;
                core.next_attempt = Some(now + self.config.reset_timeout());
                tracing::warn!(service = %self.service, "Trial call failed, circuit breaker re-opened");
            }
            BreakerState::Closed if core.failure_count >= self.config.failure_threshold => {
                core.state = BreakerState::Open;
                core.next_attempt = Some(now + self.config.reset_timeout());
                tracing::warn!(
                    service = %self.service,
                    failures = core.failure_count,
                    reset_timeout_ms = self.config.reset_timeout_ms,
                    "Failure threshold reached, circuit breaker opened"
                );
            }
            _ => {}
        }
    }

    /// Administrative reset back to Closed.
    pub fn reset(&self) {
        let mut core = self.lock();
        core.state = BreakerState::Closed;
        core.failure_count = 0;
        core.last_failure = None;
        core.next_attempt = None;
        tracing::info!(service = %self.service, "Circuit breaker reset");
    }

    /// Current state without side effects.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Diagnostic snapshot. Monotonic timestamps are translated to wall-clock
    /// time for reporting.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        let now = Instant::now();
        let wall_now = SystemTime::now();

        let to_wall = |at: Instant| {
            if at > now {
                wall_now + (at - now)
            } else {
                wall_now - (now - at)
            }
        };

        BreakerSnapshot {
            service: self.service.clone(),
            state: core.state,
            failure_count: core.failure_count,
            last_failure: core.last_failure.map(to_wall),
            next_attempt: core.next_attempt.map(to_wall),
        }
    }

    /// Service name this breaker guards.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Hard deadline for a single request attempt.
    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }
}
