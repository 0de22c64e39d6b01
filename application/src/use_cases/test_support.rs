//! Scripted doubles shared by the use case tests.

use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use crate::ports::trial_repository::{RepositoryError, TrialRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jury_domain::{Trial, TrialInteraction, TrialStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

type InteractionFilter = Box<dyn Fn(&TrialInteraction) -> bool + Send + Sync>;

/// What a scripted gateway does for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(GatewayError),
    /// Answers after a pause
    Delayed(Duration, String),
    /// Never returns
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Gateway answering from a fixed queue, in call order
pub struct SequenceGateway {
    replies: Mutex<VecDeque<Reply>>,
    pub calls: AtomicUsize,
}

impl SequenceGateway {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmGateway for SequenceGateway {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail(GatewayError::Other("No more replies".to_string())));
        resolve(reply).await
    }
}

/// Gateway answering through a routing function over (system, prompt)
pub struct RoutedGateway {
    route: Box<dyn Fn(&str, &str) -> Reply + Send + Sync>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl RoutedGateway {
    pub fn new(route: impl Fn(&str, &str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            route: Box::new(route),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmGateway for RoutedGateway {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GatewayError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        resolve((self.route)(system, prompt)).await
    }
}

async fn resolve(reply: Reply) -> Result<String, GatewayError> {
    match reply {
        Reply::Text(text) => Ok(text),
        Reply::Fail(e) => Err(e),
        Reply::Delayed(pause, text) => {
            tokio::time::sleep(pause).await;
            Ok(text)
        }
        Reply::Hang => std::future::pending().await,
    }
}

/// In-process repository with a failure switch
#[derive(Default)]
pub struct FakeRepository {
    trials: Mutex<HashMap<String, Trial>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    rejected: Mutex<Option<InteractionFilter>>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail `save_interaction` for every interaction matching `filter`
    pub fn reject_interactions(
        &self,
        filter: impl Fn(&TrialInteraction) -> bool + Send + Sync + 'static,
    ) {
        *self.rejected.lock().unwrap() = Some(Box::new(filter));
    }

    pub fn stored(&self, id: &str) -> Option<Trial> {
        self.trials.lock().unwrap().get(id).cloned()
    }

    fn check_write(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("disk full".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("unreadable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrialRepository for FakeRepository {
    async fn save_trial(&self, trial: &Trial) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut trials = self.trials.lock().unwrap();
        let interactions = trials
            .get(&trial.id)
            .map(|t| t.interactions.clone())
            .unwrap_or_default();
        let mut row = trial.clone();
        row.interactions = interactions;
        trials.insert(trial.id.clone(), row);
        Ok(())
    }

    async fn load_trials(&self) -> Result<Vec<Trial>, RepositoryError> {
        self.check_read()?;
        Ok(self.trials.lock().unwrap().values().cloned().collect())
    }

    async fn get_trial(&self, id: &str) -> Result<Option<Trial>, RepositoryError> {
        self.check_read()?;
        Ok(self.trials.lock().unwrap().get(id).cloned())
    }

    async fn save_interaction(
        &self,
        interaction: &TrialInteraction,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        if let Some(reject) = self.rejected.lock().unwrap().as_ref() {
            if reject(interaction) {
                return Err(RepositoryError::Storage("write rejected".to_string()));
            }
        }
        let mut trials = self.trials.lock().unwrap();
        let trial = trials
            .get_mut(&interaction.trial_id)
            .ok_or_else(|| RepositoryError::NotFound(interaction.trial_id.clone()))?;
        trial.interactions.push(interaction.clone());
        Ok(())
    }

    async fn load_interactions(
        &self,
        trial_id: &str,
    ) -> Result<Vec<TrialInteraction>, RepositoryError> {
        self.check_read()?;
        Ok(self
            .trials
            .lock()
            .unwrap()
            .get(trial_id)
            .map(|t| t.interactions.clone())
            .unwrap_or_default())
    }

    async fn update_status(
        &self,
        trial_id: &str,
        status: TrialStatus,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut trials = self.trials.lock().unwrap();
        let trial = trials
            .get_mut(trial_id)
            .ok_or_else(|| RepositoryError::NotFound(trial_id.to_string()))?;
        trial.status = status;
        Ok(())
    }

    async fn update_verdict(
        &self,
        trial_id: &str,
        verdict: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut trials = self.trials.lock().unwrap();
        let trial = trials
            .get_mut(trial_id)
            .ok_or_else(|| RepositoryError::NotFound(trial_id.to_string()))?;
        trial.verdict = Some(verdict.to_string());
        trial.status = TrialStatus::Completed;
        trial.completed_at = Some(completed_at);
        Ok(())
    }

    async fn mark_failed(
        &self,
        trial_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut trials = self.trials.lock().unwrap();
        let trial = trials
            .get_mut(trial_id)
            .ok_or_else(|| RepositoryError::NotFound(trial_id.to_string()))?;
        trial.status = TrialStatus::Failed;
        trial.completed_at = Some(completed_at);
        Ok(())
    }
}
