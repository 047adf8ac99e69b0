//! Error taxonomy for the runtime.
//!
//! Every failure a caller can observe is one of these variants. The retry
//! loop consults [`Error::is_retryable`]; the final error handed back after
//! exhausted retries is wrapped in [`Error::RetriesExhausted`] so callers see
//! both the attempt count and the underlying cause.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The registry has no healthy instance of the service right now.
    #[error("no healthy instances available for service '{service}'")]
    NoHealthyInstances { service: String },

    /// The circuit breaker rejected the call before any network attempt.
    #[error("circuit breaker is open for service '{service}'")]
    CircuitOpen { service: String },

    /// The attempt exceeded its hard deadline and was cancelled.
    #[error("request to service '{service}' timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    /// Connection-level failure: refused, reset, DNS, TLS.
    #[error("transport error calling service '{service}': {source}")]
    Transport {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    /// The instance answered with a non-2xx status.
    #[error("service '{service}' responded with status {status}")]
    Upstream { service: String, status: u16 },

    /// All attempts consumed; `source` is the last attempt's error.
    #[error("request to service '{service}' failed after {attempts} attempt(s) in {elapsed:?}: {source}")]
    RetriesExhausted {
        service: String,
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: Box<Error>,
    },

    /// The request could not be built or its response could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Connection failures and timeouts are always retryable; so is an empty
    /// registry, since an instance may register or recover between attempts.
    /// Upstream statuses are retryable for 5xx plus 408 and 429; other 4xx
    /// responses are the caller's fault and never retried. A rejected
    /// (circuit-open) call is terminal for this request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::NoHealthyInstances { .. } => true,
            Error::Timeout { .. } => true,
            Error::Transport { .. } => true,
            Error::Upstream { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Error::CircuitOpen { .. } => false,
            Error::RetriesExhausted { .. } => false,
            Error::InvalidRequest(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: u16) -> Error {
        Error::Upstream { service: "jobs".into(), status }
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(upstream(500).is_retryable());
        assert!(upstream(503).is_retryable());
    }

    #[test]
    fn client_errors_are_not_except_timeout_and_throttle() {
        assert!(!upstream(400).is_retryable());
        assert!(!upstream(404).is_retryable());
        assert!(upstream(408).is_retryable());
        assert!(upstream(429).is_retryable());
    }

    #[test]
    fn gating_and_terminal_errors_are_not_retryable() {
        let open = Error::CircuitOpen { service: "jobs".into() };
        assert!(!open.is_retryable());

        let exhausted = Error::RetriesExhausted {
            service: "jobs".into(),
            attempts: 3,
            elapsed: Duration::from_millis(120),
            source: Box::new(upstream(503)),
        };
        assert!(!exhausted.is_retryable());
    }

    #[test]
    fn lookup_and_network_failures_are_retryable() {
        let empty = Error::NoHealthyInstances { service: "jobs".into() };
        assert!(empty.is_retryable());

        let timeout =
            Error::Timeout { service: "jobs".into(), timeout: Duration::from_secs(5) };
        assert!(timeout.is_retryable());
    }

    #[test]
    fn messages_name_the_service() {
        let err = Error::NoHealthyInstances { service: "job-service".into() };
        assert!(err.to_string().contains("job-service"));
    }
}
