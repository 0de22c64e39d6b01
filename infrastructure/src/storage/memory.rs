//! Process-local trial repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jury_application::{RepositoryError, TrialRepository};
use jury_domain::{Trial, TrialInteraction, TrialStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Tables {
    /// Trial rows; their `interactions` field is always empty
    trials: HashMap<String, Trial>,
    /// `(insertion sequence, interaction)` per trial
    interactions: HashMap<String, Vec<(u64, TrialInteraction)>>,
    next_seq: u64,
}

/// In-memory [`TrialRepository`] with a write-failure switch.
#[derive(Default)]
pub struct InMemoryTrialRepository {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryTrialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn write(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage(
                "write rejected by failure switch".to_string(),
            ));
        }
        Ok(self.read())
    }

    fn read(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sorted_interactions(tables: &Tables, trial_id: &str) -> Vec<TrialInteraction> {
        let mut rows: Vec<&(u64, TrialInteraction)> = tables
            .interactions
            .get(trial_id)
            .map(|rows| rows.iter().collect())
            .unwrap_or_default();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            a.round_number
                .cmp(&b.round_number)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a_seq.cmp(b_seq))
        });
        rows.into_iter().map(|(_, i)| i.clone()).collect()
    }

    fn hydrate(tables: &Tables, row: &Trial) -> Trial {
        let mut trial = row.clone();
        trial.interactions = Self::sorted_interactions(tables, &row.id);
        trial
    }

    fn row_mut<'a>(
        tables: &'a mut Tables,
        trial_id: &str,
    ) -> Result<&'a mut Trial, RepositoryError> {
        tables
            .trials
            .get_mut(trial_id)
            .ok_or_else(|| RepositoryError::NotFound(trial_id.to_string()))
    }
}

#[async_trait]
impl TrialRepository for InMemoryTrialRepository {
    async fn save_trial(&self, trial: &Trial) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        let mut row = trial.clone();
        row.interactions.clear();
        tables.trials.insert(row.id.clone(), row);
        Ok(())
    }

    async fn load_trials(&self) -> Result<Vec<Trial>, RepositoryError> {
        let tables = self.read();
        let mut trials: Vec<Trial> = tables
            .trials
            .values()
            .map(|row| Self::hydrate(&tables, row))
            .collect();
        trials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trials)
    }

    async fn get_trial(&self, id: &str) -> Result<Option<Trial>, RepositoryError> {
        let tables = self.read();
        Ok(tables.trials.get(id).map(|row| Self::hydrate(&tables, row)))
    }

    async fn save_interaction(
        &self,
        interaction: &TrialInteraction,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if !tables.trials.contains_key(&interaction.trial_id) {
            return Err(RepositoryError::NotFound(interaction.trial_id.clone()));
        }
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables
            .interactions
            .entry(interaction.trial_id.clone())
            .or_default()
            .push((seq, interaction.clone()));
        Ok(())
    }

    async fn load_interactions(
        &self,
        trial_id: &str,
    ) -> Result<Vec<TrialInteraction>, RepositoryError> {
        Ok(Self::sorted_interactions(&self.read(), trial_id))
    }

    async fn update_status(
        &self,
        trial_id: &str,
        status: TrialStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        Self::row_mut(&mut tables, trial_id)?.status = status;
        Ok(())
    }

    async fn update_verdict(
        &self,
        trial_id: &str,
        verdict: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        let row = Self::row_mut(&mut tables, trial_id)?;
        row.verdict = Some(verdict.to_string());
        row.status = TrialStatus::Completed;
        row.completed_at = Some(completed_at);
        Ok(())
    }

    async fn mark_failed(
        &self,
        trial_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        let row = Self::row_mut(&mut tables, trial_id)?;
        row.status = TrialStatus::Failed;
        row.completed_at = Some(completed_at);
        Ok(())
    }
}
