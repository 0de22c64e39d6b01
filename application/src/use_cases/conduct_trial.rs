//! Conduct Trial use case
//!
//! Drives one trial through its full protocol:
//!
//! 1. create the trial and record the question
//! 2. gather every persona's initial answer (one task per persona)
//! 3. up to round 5: ask the moderator whether to continue, pose
//!    follow-ups, gather the targeted answers
//! 4. synthesize and record the verdict
//!
//! A [`TrialState`] snapshot is emitted after every meaningful change.

use super::moderator::Moderator;
use super::persona_runner::PersonaRunner;
use super::response_streamer::ResponseStreamer;
use super::stream_registry::StreamRegistry;
use super::trial_store::{TrialStore, TrialStoreError};
use crate::config::TrialParams;
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::trial_repository::TrialRepository;
use jury_domain::{
    AgentResult, FollowUpQuestion, JuryPromptTemplate, MODERATOR_SPEAKER, Persona, Question,
    Trial, TrialInteraction, TrialState, TrialStatus,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Failure reason recorded by [`TrialOrchestrator::stop_trial`]
pub const STOPPED_BY_USER: &str = "Trial stopped by user";

/// Failure reason when no persona produced a usable initial answer
pub const NO_INITIAL_RESPONSES: &str = "Failed to gather initial responses from personas";

/// Failure reason when the question cannot be persisted
pub const QUESTION_NOT_RECORDED: &str = "Could not record the question";

/// Failure reason when the verdict cannot be persisted
pub const VERDICT_NOT_RECORDED: &str = "Could not record the verdict";

const SNAPSHOT_CAPACITY: usize = 64;

/// Why the protocol ended early
enum Halt {
    Stopped,
    Failed(String),
}

impl From<TrialStoreError> for Halt {
    fn from(e: TrialStoreError) -> Self {
        Halt::Failed(e.to_string())
    }
}

/// Per-run state: the latest trial, its token, its persona runner and the
/// snapshot channel.
///
/// The runner has its own stream registry, so cancelling personas on a
/// timeout only touches this trial's streams.
struct Session<G: LlmGateway + 'static> {
    trial: Trial,
    token: CancellationToken,
    runner: PersonaRunner<G>,
    tx: mpsc::Sender<TrialState>,
}

impl<G: LlmGateway + 'static> Session<G> {
    /// Publish the current trial.
    ///
    /// Intermediate snapshots are dropped while the channel is full, so a
    /// caller that stops draining never stalls the protocol. The terminal
    /// snapshot waits for room.
    async fn emit<I>(&self, thinking: I)
    where
        I: IntoIterator<Item = String>,
    {
        let state = TrialState::new(self.trial.clone(), thinking.into_iter().collect());
        if state.is_complete {
            let _ = self.tx.send(state).await;
        } else if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(state) {
            debug!("Snapshot channel full, skipping snapshot for {}", self.trial.id);
        }
    }

    fn check(&self) -> Result<(), Halt> {
        if self.token.is_cancelled() {
            Err(Halt::Stopped)
        } else {
            Ok(())
        }
    }
}

/// Orchestrates trials
pub struct TrialOrchestrator<G: LlmGateway + 'static, R: TrialRepository + 'static> {
    gateway: Arc<G>,
    store: Arc<TrialStore<R>>,
    moderator: Moderator<G>,
    params: TrialParams,
    snapshot_capacity: usize,
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl<G: LlmGateway + 'static, R: TrialRepository + 'static> TrialOrchestrator<G, R> {
    pub fn new(gateway: Arc<G>, store: Arc<TrialStore<R>>, params: TrialParams) -> Self {
        Self {
            moderator: Moderator::new(Arc::clone(&gateway)).with_max_rounds(params.max_rounds),
            gateway,
            store,
            params,
            snapshot_capacity: SNAPSHOT_CAPACITY,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Buffer size of the snapshot channel returned by `conduct_trial`
    pub fn with_snapshot_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_capacity = capacity.max(1);
        self
    }

    /// A persona runner backed by a fresh stream registry
    fn trial_runner(&self) -> PersonaRunner<G> {
        let streamer =
            ResponseStreamer::new(Arc::clone(&self.gateway), Arc::new(StreamRegistry::new()))
                .with_retry(self.params.retry)
                .with_chunk_delay(self.params.chunk_delay);
        PersonaRunner::new(Arc::new(streamer))
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store(&self) -> &Arc<TrialStore<R>> {
        &self.store
    }

    pub fn params(&self) -> &TrialParams {
        &self.params
    }

    // ==================== Caller-facing Surface ====================

    pub async fn initialize(&self) {
        self.store.initialize().await;
    }

    pub async fn get_all_trials(&self) -> Vec<Trial> {
        self.store.get_all().await
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.store.subscribe_loading()
    }

    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.store.subscribe_error()
    }

    /// Ids of trials currently being conducted
    pub fn active_trials(&self) -> Vec<String> {
        self.lock_active().keys().cloned().collect()
    }

    /// Start a trial in the background and return its live snapshots.
    ///
    /// The last snapshot has `is_complete` set. If the trial cannot even be
    /// created the channel closes without any snapshot.
    pub fn conduct_trial(
        self: &Arc<Self>,
        question: Question,
        personas: Vec<Persona>,
    ) -> mpsc::Receiver<TrialState> {
        let (tx, rx) = mpsc::channel(self.snapshot_capacity);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(question, personas, tx).await;
        });
        rx
    }

    /// Stop a trial: cancel its in-flight work and mark it `FAILED`.
    ///
    /// Has no effect on a trial that already finished.
    pub async fn stop_trial(&self, trial_id: &str) -> Result<Trial, TrialStoreError> {
        let token = self.lock_active().get(trial_id).cloned();
        if let Some(token) = token {
            token.cancel();
        }
        info!("Stopping trial {}", trial_id);
        self.store.fail(trial_id, STOPPED_BY_USER).await
    }

    // ==================== Protocol ====================

    async fn run(&self, question: Question, personas: Vec<Persona>, tx: mpsc::Sender<TrialState>) {
        let trial = match self.store.create_trial(question.content(), personas).await {
            Ok(trial) => trial,
            Err(e) => {
                warn!("Could not create trial: {}", e);
                return;
            }
        };
        let trial_id = trial.id.clone();
        let token = CancellationToken::new();
        self.lock_active().insert(trial_id.clone(), token.clone());
        info!(
            "Trial {} started with {} persona(s)",
            trial_id,
            trial.personas.len()
        );

        let mut session = Session {
            trial,
            token,
            runner: self.trial_runner(),
            tx,
        };
        if let Err(halt) = self.deliberate(&mut session).await {
            let reason = match halt {
                Halt::Stopped => STOPPED_BY_USER.to_string(),
                Halt::Failed(reason) => reason,
            };
            match self.store.fail(&trial_id, &reason).await {
                Ok(trial) => session.trial = trial,
                Err(e) => {
                    warn!("Could not mark trial {} failed: {}", trial_id, e);
                    if let Some(trial) = self.store.get_trial(&trial_id).await {
                        session.trial = trial;
                    }
                }
            }
            session.emit([]).await;
        }

        self.lock_active().remove(&trial_id);
    }

    async fn deliberate(&self, s: &mut Session<G>) -> Result<(), Halt> {
        let trial_id = s.trial.id.clone();
        let question = s.trial.original_question.clone();
        let personas = s.trial.personas.clone();
        s.emit([]).await;

        if !self
            .record(s, TrialInteraction::initial_question(&trial_id, &question))
            .await
        {
            return Err(Halt::Failed(QUESTION_NOT_RECORDED.to_string()));
        }
        s.emit([]).await;
        s.check()?;

        s.trial = self
            .store
            .update_status(&trial_id, TrialStatus::GatheringInitialResponses)
            .await?;
        s.emit(personas.iter().map(|p| p.id.clone())).await;

        let initial = self.gather_initial(s, &question, &personas).await;
        s.check()?;
        if initial.is_empty() {
            return Err(Halt::Failed(NO_INITIAL_RESPONSES.to_string()));
        }

        s.trial = self
            .store
            .update_status(&trial_id, TrialStatus::Deliberating)
            .await?;
        s.emit([]).await;

        for round in 2..=self.params.max_rounds {
            s.check()?;
            s.emit([MODERATOR_SPEAKER.to_string()]).await;

            if !self
                .moderator
                .should_continue(&s.trial.interactions, round - 1, &personas)
                .await
            {
                break;
            }
            s.check()?;

            let follow_ups = self
                .moderator
                .generate_follow_ups(&question, &initial, &personas)
                .await;
            if follow_ups.is_empty() {
                debug!("No follow-ups for round {}, ending deliberation", round);
                break;
            }
            s.check()?;

            info!("Round {}: {} follow-up(s)", round, follow_ups.len());
            self.follow_up_round(s, round, &question, &personas, &follow_ups)
                .await;
            s.check()?;

            if let Some(trial) = self.store.get_trial(&trial_id).await {
                s.trial = trial;
            }
            s.emit([]).await;
        }

        s.trial = self
            .store
            .update_status(&trial_id, TrialStatus::GeneratingVerdict)
            .await?;
        s.emit([MODERATOR_SPEAKER.to_string()]).await;

        let verdict = self
            .moderator
            .synthesize_verdict(&question, &s.trial.interactions, &personas)
            .await;
        s.check()?;

        let round = s.trial.current_round().min(self.params.max_rounds).max(1);
        if !self
            .record(s, TrialInteraction::verdict(&trial_id, &verdict, round))
            .await
        {
            return Err(Halt::Failed(VERDICT_NOT_RECORDED.to_string()));
        }
        s.trial = self.store.complete(&trial_id, &verdict).await?;
        s.emit([]).await;
        Ok(())
    }

    /// Gather initial answers, recording each one as soon as it is usable.
    ///
    /// Returns the usable answers collected before the timeout.
    async fn gather_initial(
        &self,
        s: &mut Session<G>,
        question: &str,
        personas: &[Persona],
    ) -> Vec<AgentResult> {
        let prompt = JuryPromptTemplate::initial_query(question);
        let runner = s.runner.clone();
        let mut snapshots = runner.run_many(&prompt, personas, &s.token);
        let mut finished: HashSet<String> = HashSet::new();
        let mut harvested: Vec<AgentResult> = Vec::new();

        let gather = async {
            while let Some(snapshot) = snapshots.recv().await {
                let mut changed = false;
                for result in snapshot.iter().filter(|r| r.is_done()) {
                    if !finished.insert(result.persona_id.clone()) {
                        continue;
                    }
                    changed = true;
                    if result.is_usable() {
                        let interaction = TrialInteraction::initial_response(
                            &s.trial.id,
                            &result.persona_id,
                            &result.response,
                        );
                        self.record(s, interaction).await;
                        harvested.push(result.clone());
                    } else {
                        warn!(
                            "Persona {} gave no usable answer: {}",
                            result.persona_id,
                            result.error.as_deref().unwrap_or("empty response")
                        );
                    }
                }
                if changed {
                    s.emit(
                        snapshot
                            .iter()
                            .filter(|r| r.is_loading)
                            .map(|r| r.persona_id.clone()),
                    )
                    .await;
                }
            }
        };

        let timed_out = timeout(self.params.initial_timeout, gather).await.is_err();
        if timed_out {
            warn!(
                "Initial gather timed out after {:?}, continuing with {} answer(s)",
                self.params.initial_timeout,
                harvested.len()
            );
            runner.cancel_all(personas);
        }
        harvested
    }

    /// Pose one round of follow-ups and gather the targeted answers.
    async fn follow_up_round(
        &self,
        s: &mut Session<G>,
        round: u32,
        question: &str,
        personas: &[Persona],
        follow_ups: &[FollowUpQuestion],
    ) {
        let targets: Vec<&Persona> = follow_ups
            .iter()
            .filter_map(|f| personas.iter().find(|p| p.id == f.target_persona_id))
            .collect();
        let thinking: BTreeSet<String> = targets.iter().map(|p| p.id.clone()).collect();

        for follow_up in follow_ups {
            let interaction = TrialInteraction::follow_up_question(
                &s.trial.id,
                &follow_up.target_persona_id,
                &follow_up.question,
                round,
            );
            self.record(s, interaction).await;
            s.emit(thinking.iter().cloned()).await;
        }

        let runner = s.runner.clone();
        let mut join_set = JoinSet::new();
        for follow_up in follow_ups {
            let Some(persona) = personas.iter().find(|p| p.id == follow_up.target_persona_id)
            else {
                warn!(
                    "Follow-up target '{}' is not on this jury, no answer requested",
                    follow_up.target_persona_id
                );
                continue;
            };
            let prompt = JuryPromptTemplate::persona_follow_up_prompt(question, &follow_up.question);
            let mut updates = runner.run_one(&prompt, persona, &s.token);
            let persona_id = persona.id.clone();
            join_set.spawn(async move {
                let mut last = None;
                while let Some(update) = updates.recv().await {
                    last = Some(update);
                }
                (persona_id, last)
            });
        }
        if join_set.is_empty() {
            return;
        }

        let mut pending: Vec<String> = targets.iter().map(|p| p.id.clone()).collect();
        let ceiling = self.params.follow_up_round_timeout(follow_ups.len());

        let harvest = async {
            while let Some(joined) = join_set.join_next().await {
                let (persona_id, last) = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Follow-up task join error: {}", e);
                        continue;
                    }
                };
                if let Some(pos) = pending.iter().position(|p| *p == persona_id) {
                    pending.remove(pos);
                }
                match last {
                    Some(result) if result.is_usable() => {
                        let interaction = TrialInteraction::follow_up_response(
                            &s.trial.id,
                            &persona_id,
                            &result.response,
                            round,
                        );
                        self.record(s, interaction).await;
                    }
                    Some(result) => warn!(
                        "Persona {} gave no usable follow-up answer: {}",
                        persona_id,
                        result.error.as_deref().unwrap_or("empty response")
                    ),
                    None => warn!("Persona {} produced no follow-up output", persona_id),
                }
                s.emit(pending.iter().cloned()).await;
            }
        };

        let timed_out = timeout(ceiling, harvest).await.is_err();
        if timed_out {
            warn!("Round {} follow-ups timed out after {:?}", round, ceiling);
            let stalled: Vec<Persona> = targets.into_iter().cloned().collect();
            runner.cancel_all(&stalled);
            join_set.abort_all();
        }
    }

    /// Append through the store, keeping the session's trial current.
    ///
    /// Returns false when the interaction was not recorded.
    async fn record(&self, s: &mut Session<G>, interaction: TrialInteraction) -> bool {
        let kind = interaction.interaction_type;
        match self.store.add_interaction(interaction).await {
            Some(trial) => {
                s.trial = trial;
                true
            }
            None => {
                warn!("{} was not recorded for trial {}", kind, s.trial.id);
                false
            }
        }
    }
}
