//! Trial value objects
//!
//! These are transient: they drive live snapshots and are never persisted.

use super::entities::Trial;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A question the moderator wants one persona to answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuestion {
    pub id: String,
    pub question: String,
    /// Resolved persona id, or the raw reference when it did not resolve
    pub target_persona_id: String,
    pub reasoning: String,
}

impl FollowUpQuestion {
    pub fn new(
        question: impl Into<String>,
        target_persona_id: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            target_persona_id: target_persona_id.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// Live view of one persona's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub persona_id: String,
    /// Text accumulated so far
    pub response: String,
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    pub fn loading(persona_id: impl Into<String>) -> Self {
        Self {
            persona_id: persona_id.into(),
            response: String::new(),
            is_loading: true,
            error: None,
        }
    }

    /// Append a streamed delta while still loading.
    pub fn push_delta(&mut self, delta: &str) {
        self.response.push_str(delta);
    }

    pub fn finish(&mut self) {
        self.is_loading = false;
    }

    /// Mark as failed, keeping whatever text had already arrived.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.is_loading = false;
        self.error = Some(error.into());
    }

    /// Finished without error and with non-blank content
    pub fn is_usable(&self) -> bool {
        !self.is_loading && self.error.is_none() && !self.response.trim().is_empty()
    }

    /// Finished, successfully or not
    pub fn is_done(&self) -> bool {
        !self.is_loading
    }
}

/// Snapshot emitted to callers at every meaningful change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialState {
    pub trial: Trial,
    /// `"moderator"` and/or persona ids
    pub currently_thinking: BTreeSet<String>,
    pub is_complete: bool,
}

impl TrialState {
    pub fn new(trial: Trial, currently_thinking: BTreeSet<String>) -> Self {
        let is_complete = trial.is_terminal();
        Self {
            trial,
            currently_thinking,
            is_complete,
        }
    }

    pub fn idle(trial: Trial) -> Self {
        Self::new(trial, BTreeSet::new())
    }

    pub fn is_thinking(&self, id: &str) -> bool {
        self.currently_thinking.contains(id)
    }
}
