//! Trial parameters: deliberation loop control.
//!
//! [`TrialParams`] groups the limits and delays that drive
//! [`TrialOrchestrator`](crate::use_cases::conduct_trial::TrialOrchestrator)
//! and [`ResponseStreamer`](crate::use_cases::response_streamer::ResponseStreamer).

use jury_domain::RetryPolicy;
use std::time::Duration;

/// Hard ceiling on deliberation rounds
pub const MAX_ROUNDS_CEILING: u32 = 5;

/// Deliberation loop control parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialParams {
    /// Last round the deliberation loop may reach (round 1 is the initial gather).
    pub max_rounds: u32,
    /// Ceiling on gathering the initial responses.
    pub initial_timeout: Duration,
    /// Per follow-up share of a round's gather ceiling.
    pub follow_up_timeout: Duration,
    /// Pause between simulated stream chunks.
    pub chunk_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for TrialParams {
    fn default() -> Self {
        Self {
            max_rounds: MAX_ROUNDS_CEILING,
            initial_timeout: Duration::from_secs(300),
            follow_up_timeout: Duration::from_secs(30),
            chunk_delay: Duration::from_millis(200),
            retry: RetryPolicy::default(),
        }
    }
}

impl TrialParams {
    // ==================== Builder Methods ====================

    /// Clamped to `1..=5`.
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.clamp(1, MAX_ROUNDS_CEILING);
        self
    }

    pub fn with_initial_timeout(mut self, timeout: Duration) -> Self {
        self.initial_timeout = timeout;
        self
    }

    pub fn with_follow_up_timeout(mut self, timeout: Duration) -> Self {
        self.follow_up_timeout = timeout;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Gather ceiling for a round with `follow_ups` questions.
    pub fn follow_up_round_timeout(&self, follow_ups: usize) -> Duration {
        self.follow_up_timeout
            .saturating_mul(u32::try_from(follow_ups).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = TrialParams::default();
        assert_eq!(params.max_rounds, 5);
        assert_eq!(params.initial_timeout, Duration::from_secs(300));
        assert_eq!(params.follow_up_timeout, Duration::from_secs(30));
        assert_eq!(params.chunk_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_max_rounds_clamped() {
        assert_eq!(TrialParams::default().with_max_rounds(9).max_rounds, 5);
        assert_eq!(TrialParams::default().with_max_rounds(0).max_rounds, 1);
    }

    #[test]
    fn test_round_timeout_scales_with_follow_ups() {
        let params = TrialParams::default();
        assert_eq!(params.follow_up_round_timeout(3), Duration::from_secs(90));
        assert_eq!(params.follow_up_round_timeout(0), Duration::ZERO);
    }
}
