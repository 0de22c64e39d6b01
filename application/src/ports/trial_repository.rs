//! Trial persistence port
//!
//! Any store that satisfies this contract can back a
//! [`TrialStore`](crate::use_cases::trial_store::TrialStore).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jury_domain::{Trial, TrialInteraction, TrialStatus};
use thiserror::Error;

/// Errors reported by persistence adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Trial not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Durable storage for trials and their interactions.
#[async_trait]
pub trait TrialRepository: Send + Sync {
    /// Insert or replace the trial row. Interactions are saved separately.
    async fn save_trial(&self, trial: &Trial) -> Result<(), RepositoryError>;

    /// All trials with their interactions, newest first.
    async fn load_trials(&self) -> Result<Vec<Trial>, RepositoryError>;

    /// One trial with its interactions.
    async fn get_trial(&self, id: &str) -> Result<Option<Trial>, RepositoryError>;

    async fn save_interaction(&self, interaction: &TrialInteraction)
    -> Result<(), RepositoryError>;

    /// Interactions ordered by round, then timestamp, then insertion.
    async fn load_interactions(
        &self,
        trial_id: &str,
    ) -> Result<Vec<TrialInteraction>, RepositoryError>;

    async fn update_status(&self, trial_id: &str, status: TrialStatus)
    -> Result<(), RepositoryError>;

    /// Store the verdict and completion time; also sets status `COMPLETED`.
    async fn update_verdict(
        &self,
        trial_id: &str,
        verdict: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Mark the trial `FAILED` at `completed_at`.
    ///
    /// The default delegates to [`update_status`](Self::update_status);
    /// adapters that persist `completed_at` should override it.
    async fn mark_failed(
        &self,
        trial_id: &str,
        _completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.update_status(trial_id, TrialStatus::Failed).await
    }
}
