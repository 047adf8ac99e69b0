//! Exponential backoff between retry attempts.

use std::time::Duration;

use crate::config::RetryPolicy;

/// Delay inserted after failed attempt number `attempt` (1-based):
/// `min(initial_delay × factor^(attempt − 1), max_delay)`.
///
/// Deterministic on purpose: callers rely on the exact sequence.
pub fn retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponent = (attempt - 1).min(63);
    let delay_ms = policy.initial_delay_ms as f64 * policy.backoff_factor.powi(exponent as i32);
    let capped = if delay_ms.is_finite() {
        (delay_ms as u64).min(policy.max_delay_ms)
    } else {
        policy.max_delay_ms
    };

    Duration::from_millis(capped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_produces_documented_sequence() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
        };
        let delays: Vec<u64> =
            (1..=3).map(|a| retry_delay(&policy, a).as_millis() as u64).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000]);
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
        };
        assert_eq!(retry_delay(&policy, 5).as_millis(), 16_000u128.min(10_000));
        assert_eq!(retry_delay(&policy, 40).as_millis(), 10_000);
    }

    #[test]
    fn attempt_zero_has_no_delay() {
        assert_eq!(retry_delay(&RetryPolicy::default(), 0), Duration::ZERO);
    }

    #[test]
    fn factor_one_is_constant_delay() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_factor: 1.0,
        };
        assert_eq!(retry_delay(&policy, 1).as_millis(), 500);
        assert_eq!(retry_delay(&policy, 4).as_millis(), 500);
    }
}
