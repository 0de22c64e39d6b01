//! Trial store
//!
//! Single source of truth for trials. Every mutation is persisted through
//! the [`TrialRepository`] first and only then applied to the in-memory
//! cache. When a write fails the cache is left untouched, so the cache may
//! trail persistence but never runs ahead of it.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::trial_repository::{RepositoryError, TrialRepository};
use chrono::Utc;
use jury_domain::{DomainError, Persona, Trial, TrialInteraction, TrialStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// Errors returned by [`TrialStore`] mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrialStoreError {
    #[error("Trial not found: {0}")]
    NotFound(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] RepositoryError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Write-through cached trial storage
pub struct TrialStore<R: TrialRepository + 'static> {
    repository: Arc<R>,
    cache: RwLock<HashMap<String, Trial>>,
    /// Serializes mutations so check, persist and cache update act as one step
    write_gate: Mutex<()>,
    loading: watch::Sender<bool>,
    last_error: watch::Sender<Option<String>>,
    logger: Arc<dyn ConversationLogger>,
}

impl<R: TrialRepository + 'static> TrialStore<R> {
    pub fn new(repository: Arc<R>) -> Self {
        let (loading, _) = watch::channel(false);
        let (last_error, _) = watch::channel(None);
        Self {
            repository,
            cache: RwLock::new(HashMap::new()),
            write_gate: Mutex::new(()),
            loading,
            last_error,
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, Trial>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, Trial>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }

    fn record_error(&self, context: &str, error: &RepositoryError) {
        warn!("{}: {}", context, error);
        self.last_error
            .send_replace(Some(format!("{}: {}", context, error)));
    }

    // ==================== Observable State ====================

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.last_error.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn clear_error(&self) {
        self.last_error.send_replace(None);
    }

    // ==================== Queries ====================

    /// Cached trial, falling back to the repository on a miss.
    pub async fn get_trial(&self, trial_id: &str) -> Option<Trial> {
        if let Some(trial) = self.read_cache().get(trial_id) {
            return Some(trial.clone());
        }

        match self.repository.get_trial(trial_id).await {
            Ok(Some(trial)) => {
                self.write_cache()
                    .entry(trial.id.clone())
                    .or_insert_with(|| trial.clone());
                Some(trial)
            }
            Ok(None) => None,
            Err(e) => {
                self.record_error("Failed to load trial", &e);
                None
            }
        }
    }

    /// All trials, newest first. Loads from the repository only when the
    /// cache is empty.
    pub async fn get_all(&self) -> Vec<Trial> {
        let cached: Vec<Trial> = self.read_cache().values().cloned().collect();
        let mut trials = if cached.is_empty() {
            match self.repository.load_trials().await {
                Ok(trials) => {
                    let mut cache = self.write_cache();
                    for trial in &trials {
                        cache
                            .entry(trial.id.clone())
                            .or_insert_with(|| trial.clone());
                    }
                    trials
                }
                Err(e) => {
                    self.record_error("Failed to load trials", &e);
                    Vec::new()
                }
            }
        } else {
            cached
        };
        trials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        trials
    }

    /// Bulk-load every stored trial into the cache.
    ///
    /// Progress and failure are published on the loading and error channels.
    pub async fn initialize(&self) {
        self.loading.send_replace(true);
        match self.repository.load_trials().await {
            Ok(trials) => {
                info!("Loaded {} stored trial(s)", trials.len());
                let mut cache = self.write_cache();
                for trial in trials {
                    cache.insert(trial.id.clone(), trial);
                }
                drop(cache);
                self.clear_error();
            }
            Err(e) => self.record_error("Failed to load trials", &e),
        }
        self.loading.send_replace(false);
    }

    // ==================== Mutations ====================

    /// Create and persist a new trial in `INITIALIZING`.
    pub async fn create_trial(
        &self,
        question: &str,
        personas: Vec<Persona>,
    ) -> Result<Trial, TrialStoreError> {
        let trial = Trial::new(question, personas);
        let _gate = self.write_gate.lock().await;

        if let Err(e) = self.repository.save_trial(&trial).await {
            self.record_error("Failed to save trial", &e);
            return Err(e.into());
        }
        self.write_cache().insert(trial.id.clone(), trial.clone());
        self.logger.log(ConversationEvent::trial_created(&trial));
        debug!("Created trial {}", trial.id);
        Ok(trial)
    }

    /// Append an interaction.
    ///
    /// Returns `None` when the trial is unknown or terminal, the interaction
    /// would move the round backwards, or persistence fails. In every such
    /// case the interaction is not recorded.
    pub async fn add_interaction(&self, interaction: TrialInteraction) -> Option<Trial> {
        let _gate = self.write_gate.lock().await;
        let mut trial = self.get_trial(&interaction.trial_id).await?;

        if let Err(e) = trial.check_append(&interaction) {
            debug!("Dropping interaction for {}: {}", trial.id, e);
            return None;
        }
        if let Err(e) = self.repository.save_interaction(&interaction).await {
            self.record_error("Failed to save interaction", &e);
            return None;
        }

        self.logger
            .log(ConversationEvent::interaction_added(&interaction));
        trial.append(interaction).ok()?;
        self.write_cache().insert(trial.id.clone(), trial.clone());
        Some(trial)
    }

    /// Move a trial to a later non-terminal status.
    pub async fn update_status(
        &self,
        trial_id: &str,
        status: TrialStatus,
    ) -> Result<Trial, TrialStoreError> {
        let _gate = self.write_gate.lock().await;
        let mut trial = self.require(trial_id).await?;
        trial.transition_to(status)?;

        if let Err(e) = self.repository.update_status(trial_id, status).await {
            self.record_error("Failed to update status", &e);
            return Err(e.into());
        }
        self.logger
            .log(ConversationEvent::status_changed(trial_id, status));
        info!("Trial {} -> {}", trial_id, status);
        self.write_cache().insert(trial.id.clone(), trial.clone());
        Ok(trial)
    }

    /// Mark a trial `COMPLETED` with its verdict.
    pub async fn complete(&self, trial_id: &str, verdict: &str) -> Result<Trial, TrialStoreError> {
        let _gate = self.write_gate.lock().await;
        let mut trial = self.require(trial_id).await?;
        let now = Utc::now();
        trial.complete(verdict, now)?;

        if let Err(e) = self.repository.update_verdict(trial_id, verdict, now).await {
            self.record_error("Failed to save verdict", &e);
            return Err(e.into());
        }
        self.logger
            .log(ConversationEvent::trial_completed(trial_id, verdict));
        info!("Trial {} completed", trial_id);
        self.write_cache().insert(trial.id.clone(), trial.clone());
        Ok(trial)
    }

    /// Mark a trial `FAILED`, appending a `"system"` interaction with the reason.
    ///
    /// A trial that is already terminal is returned unchanged.
    pub async fn fail(&self, trial_id: &str, reason: &str) -> Result<Trial, TrialStoreError> {
        let _gate = self.write_gate.lock().await;
        let mut trial = self.require(trial_id).await?;
        if trial.is_terminal() {
            debug!("Trial {} already {}, not failing", trial_id, trial.status);
            return Ok(trial);
        }

        let round = trial.current_round().max(1);
        let failure = TrialInteraction::failure(trial_id, reason, round);
        let now = Utc::now();

        if let Err(e) = self.repository.save_interaction(&failure).await {
            self.record_error("Failed to save failure", &e);
            return Err(e.into());
        }
        self.logger
            .log(ConversationEvent::interaction_added(&failure));
        if let Err(e) = self.repository.mark_failed(trial_id, now).await {
            self.record_error("Failed to mark trial failed", &e);
            return Err(e.into());
        }

        trial.fail(failure, now)?;
        self.logger.log(ConversationEvent::trial_failed(trial_id, reason));
        warn!("Trial {} failed: {}", trial_id, reason);
        self.write_cache().insert(trial.id.clone(), trial.clone());
        Ok(trial)
    }

    async fn require(&self, trial_id: &str) -> Result<Trial, TrialStoreError> {
        self.get_trial(trial_id)
            .await
            .ok_or_else(|| TrialStoreError::NotFound(trial_id.to_string()))
    }
}
