//! Deliberation configuration from TOML (`[trial]` and `[retry]` sections)

use super::ConfigValidationError;
use jury_application::{MAX_ROUNDS_CEILING, TrialParams};
use jury_domain::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw trial configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTrialConfig {
    /// Last round the deliberation may reach (1..=5)
    pub max_rounds: u32,
    /// Ceiling on gathering the initial answers
    pub initial_timeout_secs: u64,
    /// Per follow-up share of a round's ceiling
    pub follow_up_timeout_secs: u64,
    /// Pause between displayed chunks
    pub chunk_delay_ms: u64,
}

impl Default for FileTrialConfig {
    fn default() -> Self {
        let params = TrialParams::default();
        Self {
            max_rounds: params.max_rounds,
            initial_timeout_secs: params.initial_timeout.as_secs(),
            follow_up_timeout_secs: params.follow_up_timeout.as_secs(),
            chunk_delay_ms: params.chunk_delay.as_millis() as u64,
        }
    }
}

impl FileTrialConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_rounds == 0 || self.max_rounds > MAX_ROUNDS_CEILING {
            return Err(ConfigValidationError::InvalidMaxRounds(self.max_rounds));
        }
        if self.initial_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "trial.initial_timeout_secs",
            ));
        }
        if self.follow_up_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "trial.follow_up_timeout_secs",
            ));
        }
        Ok(())
    }

    pub fn initial_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_timeout_secs)
    }

    pub fn follow_up_timeout(&self) -> Duration {
        Duration::from_secs(self.follow_up_timeout_secs)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

/// Raw retry configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl FileRetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}
