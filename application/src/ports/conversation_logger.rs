//! Port for structured trial transcript logging.
//!
//! [`ConversationLogger`] records trial lifecycle events to a
//! machine-readable log (JSONL in the default adapter). This is separate
//! from `tracing` diagnostics: tracing is for operators, this log is the
//! full transcript.

use jury_domain::{Trial, TrialInteraction, TrialStatus};
use serde_json::{Value, json};

/// A structured trial event for logging.
pub struct ConversationEvent {
    /// Event type identifier, e.g. `"interaction_added"`.
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn trial_created(trial: &Trial) -> Self {
        Self::new(
            "trial_created",
            json!({
                "trial_id": trial.id,
                "question": trial.original_question,
                "personas": trial.personas.iter().map(|p| &p.name).collect::<Vec<_>>(),
            }),
        )
    }

    pub fn interaction_added(interaction: &TrialInteraction) -> Self {
        Self::new(
            "interaction_added",
            json!({
                "trial_id": interaction.trial_id,
                "interaction_type": interaction.interaction_type.as_str(),
                "speaker": interaction.speaker,
                "target_persona": interaction.target_persona,
                "round": interaction.round_number,
                "content": interaction.content,
            }),
        )
    }

    pub fn status_changed(trial_id: &str, status: TrialStatus) -> Self {
        Self::new(
            "status_changed",
            json!({ "trial_id": trial_id, "status": status.as_str() }),
        )
    }

    pub fn trial_completed(trial_id: &str, verdict: &str) -> Self {
        Self::new(
            "trial_completed",
            json!({ "trial_id": trial_id, "verdict": verdict }),
        )
    }

    pub fn trial_failed(trial_id: &str, reason: &str) -> Self {
        Self::new(
            "trial_failed",
            json!({ "trial_id": trial_id, "reason": reason }),
        )
    }
}

/// Port for logging trial events to a structured log.
///
/// `log` is synchronous and infallible; adapters swallow write failures.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
