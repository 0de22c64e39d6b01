//! Snapshot bookkeeping shared by the reporters

use jury_domain::{
    AgentResult, Persona, Trial, TrialInteraction, TrialState, TrialStatus, speaker_label,
};
use std::collections::HashSet;

/// Remembers what has already been shown so each interaction prints once.
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    seen: HashSet<String>,
    status: Option<TrialStatus>,
    finished: HashSet<String>,
}

impl SnapshotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interactions of `trial` not returned by an earlier call, in order.
    pub fn fresh<'a>(&mut self, trial: &'a Trial) -> Vec<&'a TrialInteraction> {
        trial
            .interactions
            .iter()
            .filter(|i| self.seen.insert(i.id.clone()))
            .collect()
    }

    /// Results that finished since the last call, in list order.
    pub fn newly_finished<'a>(&mut self, results: &'a [AgentResult]) -> Vec<&'a AgentResult> {
        results
            .iter()
            .filter(|r| r.is_done() && self.finished.insert(r.persona_id.clone()))
            .collect()
    }

    /// The new status, if it differs from the last one seen.
    pub fn status_change(&mut self, status: TrialStatus) -> Option<TrialStatus> {
        if self.status == Some(status) {
            return None;
        }
        self.status = Some(status);
        Some(status)
    }
}

/// Display names of the personas still answering.
pub fn loading_summary(results: &[AgentResult], personas: &[Persona]) -> String {
    results
        .iter()
        .filter(|r| r.is_loading)
        .map(|r| speaker_label(&r.persona_id, personas))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Display names of whoever is working, e.g. `"The VC, Moderator"`.
pub fn thinking_summary(state: &TrialState) -> String {
    state
        .currently_thinking
        .iter()
        .map(|id| speaker_label(id, &state.trial.personas))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use jury_domain::MODERATOR_SPEAKER;
    use std::collections::BTreeSet;

    #[test]
    fn test_fresh_returns_each_interaction_once() {
        let mut trial = Trial::new("q", vec![]);
        let id = trial.id.clone();
        trial
            .append(TrialInteraction::initial_question(&id, "q"))
            .unwrap();

        let mut tracker = SnapshotTracker::new();
        assert_eq!(tracker.fresh(&trial).len(), 1);
        assert!(tracker.fresh(&trial).is_empty());

        trial
            .append(TrialInteraction::initial_response(&id, "p", "a"))
            .unwrap();
        let fresh = tracker.fresh(&trial);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].content, "a");
    }

    #[test]
    fn test_newly_finished_reports_each_persona_once() {
        let personas = vec![
            Persona::with_id("vc", "The VC", "", ""),
            Persona::with_id("mom", "The Mom", "", ""),
        ];
        let mut results = vec![AgentResult::loading("vc"), AgentResult::loading("mom")];
        let mut tracker = SnapshotTracker::new();
        assert!(tracker.newly_finished(&results).is_empty());
        assert_eq!(loading_summary(&results, &personas), "The VC, The Mom");

        results[1].fail("boom");
        let done = tracker.newly_finished(&results);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].persona_id, "mom");
        assert!(tracker.newly_finished(&results).is_empty());
        assert_eq!(loading_summary(&results, &personas), "The VC");
    }

    #[test]
    fn test_status_change_only_reports_transitions() {
        let mut tracker = SnapshotTracker::new();
        assert_eq!(
            tracker.status_change(TrialStatus::Initializing),
            Some(TrialStatus::Initializing)
        );
        assert_eq!(tracker.status_change(TrialStatus::Initializing), None);
        assert_eq!(
            tracker.status_change(TrialStatus::Deliberating),
            Some(TrialStatus::Deliberating)
        );
    }

    #[test]
    fn test_thinking_summary_uses_display_names() {
        let trial = Trial::new("q", vec![Persona::with_id("vc", "The VC", "", "")]);
        let thinking: BTreeSet<String> =
            ["vc".to_string(), MODERATOR_SPEAKER.to_string()].into();
        let state = TrialState::new(trial, thinking);
        assert_eq!(thinking_summary(&state), "Moderator, The VC");
    }
}
