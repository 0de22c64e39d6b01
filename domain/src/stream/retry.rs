//! Retry policy for model calls

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a failed model call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient (timeout, connection, I/O); retried with backoff
    Recoverable,
    /// Auth or invalid input; never retried, stream is cancelled
    Fatal,
    /// Surfaced without retry
    Other,
}

impl ErrorClass {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorClass::Recoverable)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorClass::Fatal)
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn calculate_retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` failed with `class`.
    pub fn should_retry(&self, attempt: u32, class: ErrorClass) -> bool {
        class.is_recoverable() && attempt < self.max_attempts
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.calculate_retry_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.calculate_retry_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.calculate_retry_delay(3), Duration::from_millis(4000));
        assert_eq!(policy.calculate_retry_delay(4), Duration::from_millis(8000));
        assert_eq!(policy.calculate_retry_delay(5), Duration::from_millis(10_000));
        assert_eq!(policy.calculate_retry_delay(60), Duration::from_millis(10_000));
    }

    #[test]
    fn test_only_recoverable_errors_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, ErrorClass::Recoverable));
        assert!(policy.should_retry(2, ErrorClass::Recoverable));
        assert!(!policy.should_retry(3, ErrorClass::Recoverable));
        assert!(!policy.should_retry(1, ErrorClass::Fatal));
        assert!(!policy.should_retry(1, ErrorClass::Other));
    }
}
