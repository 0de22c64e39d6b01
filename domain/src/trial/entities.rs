//! Trial entities

use crate::core::error::DomainError;
use crate::persona::entities::Persona;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker id used for moderator interactions
pub const MODERATOR_SPEAKER: &str = "moderator";

/// Speaker id used for synthetic failure interactions
pub const SYSTEM_SPEAKER: &str = "system";

/// Status of a trial.
///
/// ```text
/// Initializing -> GatheringInitialResponses -> Deliberating -> GeneratingVerdict -> Completed
///       \                   \                       \                  \
///        +-------------------+-----------------------+------------------+--> Failed
/// ```
///
/// Transitions only move forward. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialStatus {
    Initializing,
    GatheringInitialResponses,
    Deliberating,
    GeneratingVerdict,
    Completed,
    Failed,
}

impl TrialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialStatus::Initializing => "INITIALIZING",
            TrialStatus::GatheringInitialResponses => "GATHERING_INITIAL_RESPONSES",
            TrialStatus::Deliberating => "DELIBERATING",
            TrialStatus::GeneratingVerdict => "GENERATING_VERDICT",
            TrialStatus::Completed => "COMPLETED",
            TrialStatus::Failed => "FAILED",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TrialStatus::Initializing => "Initializing",
            TrialStatus::GatheringInitialResponses => "Gathering initial responses",
            TrialStatus::Deliberating => "Deliberating",
            TrialStatus::GeneratingVerdict => "Generating verdict",
            TrialStatus::Completed => "Completed",
            TrialStatus::Failed => "Failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            TrialStatus::Initializing => 0,
            TrialStatus::GatheringInitialResponses => 1,
            TrialStatus::Deliberating => 2,
            TrialStatus::GeneratingVerdict => 3,
            TrialStatus::Completed | TrialStatus::Failed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrialStatus::Completed | TrialStatus::Failed)
    }

    /// Whether `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: TrialStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TrialStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZING" => Ok(TrialStatus::Initializing),
            "GATHERING_INITIAL_RESPONSES" => Ok(TrialStatus::GatheringInitialResponses),
            "DELIBERATING" => Ok(TrialStatus::Deliberating),
            "GENERATING_VERDICT" => Ok(TrialStatus::GeneratingVerdict),
            "COMPLETED" => Ok(TrialStatus::Completed),
            "FAILED" => Ok(TrialStatus::Failed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Kind of transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    InitialQuestion,
    InitialResponse,
    FollowUpQuestion,
    FollowUpResponse,
    Verdict,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::InitialQuestion => "INITIAL_QUESTION",
            InteractionType::InitialResponse => "INITIAL_RESPONSE",
            InteractionType::FollowUpQuestion => "FOLLOW_UP_QUESTION",
            InteractionType::FollowUpResponse => "FOLLOW_UP_RESPONSE",
            InteractionType::Verdict => "VERDICT",
        }
    }

    /// Whether a persona produced this interaction
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            InteractionType::InitialResponse | InteractionType::FollowUpResponse
        )
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InteractionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIAL_QUESTION" => Ok(InteractionType::InitialQuestion),
            "INITIAL_RESPONSE" => Ok(InteractionType::InitialResponse),
            "FOLLOW_UP_QUESTION" => Ok(InteractionType::FollowUpQuestion),
            "FOLLOW_UP_RESPONSE" => Ok(InteractionType::FollowUpResponse),
            "VERDICT" => Ok(InteractionType::Verdict),
            other => Err(DomainError::UnknownInteractionType(other.to_string())),
        }
    }
}

/// One entry of a trial transcript (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialInteraction {
    pub id: String,
    pub trial_id: String,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    /// `"moderator"`, `"system"` or a persona id
    pub speaker: String,
    pub content: String,
    /// Only set for follow-up questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_persona: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub round_number: u32,
}

impl TrialInteraction {
    pub fn new(
        trial_id: impl Into<String>,
        interaction_type: InteractionType,
        speaker: impl Into<String>,
        content: impl Into<String>,
        round_number: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trial_id: trial_id.into(),
            interaction_type,
            speaker: speaker.into(),
            content: content.into(),
            target_persona: None,
            timestamp: Utc::now(),
            round_number: round_number.max(1),
        }
    }

    pub fn initial_question(trial_id: &str, question: &str) -> Self {
        Self::new(
            trial_id,
            InteractionType::InitialQuestion,
            MODERATOR_SPEAKER,
            question,
            1,
        )
    }

    pub fn initial_response(trial_id: &str, persona_id: &str, content: &str) -> Self {
        Self::new(
            trial_id,
            InteractionType::InitialResponse,
            persona_id,
            content,
            1,
        )
    }

    pub fn follow_up_question(
        trial_id: &str,
        target_persona_id: &str,
        question: &str,
        round: u32,
    ) -> Self {
        let mut interaction = Self::new(
            trial_id,
            InteractionType::FollowUpQuestion,
            MODERATOR_SPEAKER,
            question,
            round,
        );
        interaction.target_persona = Some(target_persona_id.to_string());
        interaction
    }

    pub fn follow_up_response(trial_id: &str, persona_id: &str, content: &str, round: u32) -> Self {
        Self::new(
            trial_id,
            InteractionType::FollowUpResponse,
            persona_id,
            content,
            round,
        )
    }

    pub fn verdict(trial_id: &str, content: &str, round: u32) -> Self {
        Self::new(
            trial_id,
            InteractionType::Verdict,
            MODERATOR_SPEAKER,
            content,
            round,
        )
    }

    /// Synthetic interaction recording why a trial failed.
    pub fn failure(trial_id: &str, reason: &str, round: u32) -> Self {
        Self::new(
            trial_id,
            InteractionType::Verdict,
            SYSTEM_SPEAKER,
            format!("Trial failed: {}", reason),
            round,
        )
    }

    pub fn is_from_moderator(&self) -> bool {
        self.speaker == MODERATOR_SPEAKER
    }
}

/// One deliberation session (Aggregate root)
///
/// Invariants enforced here:
/// - `personas` is fixed at creation
/// - `interactions` only grows, with non-decreasing round numbers
/// - `status` only moves forward (see [`TrialStatus`])
/// - `completed_at` is set iff the status is terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub id: String,
    pub original_question: String,
    pub personas: Vec<Persona>,
    pub interactions: Vec<TrialInteraction>,
    pub status: TrialStatus,
    #[serde(default)]
    pub verdict: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Trial {
    pub fn new(original_question: impl Into<String>, personas: Vec<Persona>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_question: original_question.into(),
            personas,
            interactions: Vec::new(),
            status: TrialStatus::Initializing,
            verdict: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Highest round number recorded so far (0 for an empty transcript)
    pub fn current_round(&self) -> u32 {
        self.interactions
            .iter()
            .map(|i| i.round_number)
            .max()
            .unwrap_or(0)
    }

    /// Check that `interaction` may be appended, without appending it.
    pub fn check_append(&self, interaction: &TrialInteraction) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::TrialTerminal(self.id.clone()));
        }
        if interaction.interaction_type == InteractionType::InitialQuestion {
            if interaction.round_number != 1 {
                return Err(DomainError::QuestionOutOfRound(interaction.round_number));
            }
            if self
                .interactions
                .iter()
                .any(|i| i.interaction_type == InteractionType::InitialQuestion)
            {
                return Err(DomainError::DuplicateQuestion(self.id.clone()));
            }
        }
        let current = self.current_round();
        if interaction.round_number < current {
            return Err(DomainError::RoundRegression {
                current,
                attempted: interaction.round_number,
            });
        }
        Ok(())
    }

    pub fn append(&mut self, interaction: TrialInteraction) -> Result<(), DomainError> {
        self.check_append(&interaction)?;
        self.interactions.push(interaction);
        Ok(())
    }

    /// Move to a non-terminal status.
    ///
    /// Use [`complete`](Self::complete) and [`fail`](Self::fail) for the
    /// terminal ones, since they carry extra data.
    pub fn transition_to(&mut self, status: TrialStatus) -> Result<(), DomainError> {
        if status.is_terminal() || !self.status.can_transition_to(status) {
            return Err(self.transition_error(status));
        }
        self.status = status;
        Ok(())
    }

    pub fn complete(
        &mut self,
        verdict: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(TrialStatus::Completed) {
            return Err(self.transition_error(TrialStatus::Completed));
        }
        self.status = TrialStatus::Completed;
        self.verdict = Some(verdict.into());
        self.completed_at = Some(at);
        Ok(())
    }

    /// Append the failure interaction and mark the trial failed.
    pub fn fail(&mut self, failure: TrialInteraction, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(TrialStatus::Failed) {
            return Err(self.transition_error(TrialStatus::Failed));
        }
        self.append(failure)?;
        self.status = TrialStatus::Failed;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Whether `persona_id` already answered with `interaction_type` in `round`.
    pub fn has_response(
        &self,
        persona_id: &str,
        interaction_type: InteractionType,
        round: u32,
    ) -> bool {
        self.interactions.iter().any(|i| {
            i.speaker == persona_id
                && i.interaction_type == interaction_type
                && i.round_number == round
        })
    }

    pub fn persona(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    fn transition_error(&self, to: TrialStatus) -> DomainError {
        if self.is_terminal() {
            DomainError::TrialTerminal(self.id.clone())
        } else {
            DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            }
        }
    }
}
