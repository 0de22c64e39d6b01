//! Progress reporting for trial execution

use super::tracker::{SnapshotTracker, loading_summary, thinking_summary};
use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use jury_domain::{AgentResult, Persona, TrialState, TrialStatus};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// Receives every snapshot of a running trial
pub trait TrialProgress: Send + Sync {
    fn on_snapshot(&self, state: &TrialState);

    /// Called once with the last snapshot
    fn on_finish(&self, state: &TrialState);
}

/// Drain a trial's snapshot channel into `progress`.
///
/// Returns the last snapshot, or `None` if the trial never started.
pub async fn follow_trial(
    mut snapshots: mpsc::Receiver<TrialState>,
    progress: &dyn TrialProgress,
) -> Option<TrialState> {
    let mut last = None;
    while let Some(state) = snapshots.recv().await {
        progress.on_snapshot(&state);
        last = Some(state);
    }
    if let Some(state) = &last {
        progress.on_finish(state);
    }
    last
}

/// Receives every result list of a summoned jury
pub trait SummonProgress: Send + Sync {
    fn on_results(&self, results: &[AgentResult], personas: &[Persona]);

    /// Called once with the last result list
    fn on_finish(&self, results: &[AgentResult], personas: &[Persona]);
}

/// Drain a summons' result channel into `progress`.
///
/// Returns the last result list, empty if nothing arrived.
pub async fn follow_summons(
    mut updates: mpsc::UnboundedReceiver<Vec<AgentResult>>,
    personas: &[Persona],
    progress: &dyn SummonProgress,
) -> Vec<AgentResult> {
    let mut last = Vec::new();
    while let Some(results) = updates.recv().await {
        progress.on_results(&results, personas);
        last = results;
    }
    progress.on_finish(&last, personas);
    last
}

/// Spinner showing who is thinking, with each interaction printed above it
pub struct ProgressReporter {
    spinner: ProgressBar,
    tracker: Mutex<SnapshotTracker>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self {
            spinner,
            tracker: Mutex::new(SnapshotTracker::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn tracker(&self) -> MutexGuard<'_, SnapshotTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialProgress for ProgressReporter {
    fn on_snapshot(&self, state: &TrialState) {
        let mut tracker = self.tracker();
        for interaction in tracker.fresh(&state.trial) {
            self.spinner.println(format!(
                "{}\n",
                ConsoleFormatter::format_interaction(interaction, &state.trial.personas)
            ));
        }
        if let Some(status) = tracker.status_change(state.trial.status) {
            self.spinner.set_prefix(status.display_name());
        }

        let thinking = thinking_summary(state);
        if thinking.is_empty() {
            self.spinner.set_message(String::new());
        } else {
            self.spinner.set_message(format!("thinking: {}", thinking));
        }
    }

    fn on_finish(&self, state: &TrialState) {
        self.spinner.finish_and_clear();
        let line = match state.trial.status {
            TrialStatus::Completed => "Trial complete".green().bold(),
            TrialStatus::Failed => "Trial failed".red().bold(),
            other => other.display_name().yellow().bold(),
        };
        eprintln!("{}", line);
    }
}

impl SummonProgress for ProgressReporter {
    fn on_results(&self, results: &[AgentResult], personas: &[Persona]) {
        for result in self.tracker().newly_finished(results) {
            self.spinner.println(format!(
                "{}\n",
                ConsoleFormatter::format_agent_result(result, personas)
            ));
        }
        let loading = loading_summary(results, personas);
        if loading.is_empty() {
            self.spinner.set_message(String::new());
        } else {
            self.spinner.set_message(format!("thinking: {}", loading));
        }
    }

    fn on_finish(&self, results: &[AgentResult], _personas: &[Persona]) {
        self.spinner.finish_and_clear();
        let answered = results.iter().filter(|r| r.is_usable()).count();
        eprintln!(
            "{}",
            format!("{}/{} answered", answered, results.len()).green().bold()
        );
    }
}

/// Plain line-based progress (no spinner), for non-terminal stderr
#[derive(Default)]
pub struct SimpleProgress {
    tracker: Mutex<SnapshotTracker>,
}

impl SimpleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrialProgress for SimpleProgress {
    fn on_snapshot(&self, state: &TrialState) {
        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = tracker.status_change(state.trial.status) {
            eprintln!("{} {}", "->".cyan(), status.display_name().bold());
        }
        for interaction in tracker.fresh(&state.trial) {
            eprintln!(
                "{}\n",
                ConsoleFormatter::format_interaction(interaction, &state.trial.personas)
            );
        }
    }

    fn on_finish(&self, state: &TrialState) {
        eprintln!("{} {}", "->".cyan(), state.trial.status.display_name().bold());
    }
}

impl SummonProgress for SimpleProgress {
    fn on_results(&self, results: &[AgentResult], personas: &[Persona]) {
        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        for result in tracker.newly_finished(results) {
            eprintln!(
                "{}\n",
                ConsoleFormatter::format_agent_result(result, personas)
            );
        }
    }

    fn on_finish(&self, results: &[AgentResult], _personas: &[Persona]) {
        let answered = results.iter().filter(|r| r.is_usable()).count();
        eprintln!("{} {}/{} answered", "->".cyan(), answered, results.len());
    }
}

/// Reporter for `--quiet`
pub struct NoProgress;

impl TrialProgress for NoProgress {
    fn on_snapshot(&self, _state: &TrialState) {}

    fn on_finish(&self, _state: &TrialState) {}
}

impl SummonProgress for NoProgress {
    fn on_results(&self, _results: &[AgentResult], _personas: &[Persona]) {}

    fn on_finish(&self, _results: &[AgentResult], _personas: &[Persona]) {}
}
