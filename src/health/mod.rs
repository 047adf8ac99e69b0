//! Active health checking subsystem.
//!
//! # Data Flow
//! ```text
//! monitor.rs: periodic timer
//!     → snapshot all registered instances
//!     → prober.rs: one bounded-timeout GET per instance, all concurrent
//!     → registry.update_health per verdict
//!     → registry.evict_expired(unhealthy_threshold × interval)
//! ```
//!
//! # Design Decisions
//! - Probes are independent and concurrent; one slow instance never delays
//!   the verdicts for the others beyond its own timeout
//! - Probe failures only mutate registry state, never surface to callers
//! - 2xx is healthy; everything else (timeout, transport error, non-2xx)
//!   is unhealthy

pub mod monitor;
pub mod prober;

pub use monitor::HealthMonitor;
pub use prober::probe;
