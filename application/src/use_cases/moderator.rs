//! Moderator use case
//!
//! Model-backed decisions over the accumulated transcript. Every method
//! degrades instead of failing: stop on error, no follow-ups on error, a
//! fallback verdict on error.

use crate::config::MAX_ROUNDS_CEILING;
use crate::ports::llm_gateway::LlmGateway;
use jury_domain::{
    AgentResult, FollowUpQuestion, JuryPromptTemplate, Persona, TrialInteraction,
    format_transcript, parse_continue_decision, parse_follow_up_questions, persona_name,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Moderator driving a deliberation
pub struct Moderator<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    max_rounds: u32,
}

impl<G: LlmGateway + 'static> Moderator<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            max_rounds: MAX_ROUNDS_CEILING,
        }
    }

    /// Never above the hard ceiling of 5.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.min(MAX_ROUNDS_CEILING);
        self
    }

    /// Whether another deliberation round is worthwhile.
    ///
    /// Always false once `round_count` reaches the round limit, whatever
    /// the model says.
    pub async fn should_continue(
        &self,
        interactions: &[TrialInteraction],
        round_count: u32,
        personas: &[Persona],
    ) -> bool {
        if round_count >= self.max_rounds {
            debug!("Round limit reached ({}), stopping", round_count);
            return false;
        }

        let transcript = format_transcript(interactions, personas);
        let result = self
            .gateway
            .generate(
                &JuryPromptTemplate::continue_system(self.max_rounds),
                &JuryPromptTemplate::continue_prompt(&transcript, round_count, self.max_rounds),
            )
            .await;

        match result {
            Ok(reply) => {
                let decision = parse_continue_decision(&reply);
                info!(
                    "Moderator decision after round {}: {}",
                    round_count,
                    if decision { "continue" } else { "stop" }
                );
                decision
            }
            Err(e) => {
                warn!("Continue decision failed, stopping: {}", e);
                false
            }
        }
    }

    /// Follow-up questions for the given answers.
    ///
    /// Only finished, non-blank, error-free answers are shown to the model.
    pub async fn generate_follow_ups(
        &self,
        question: &str,
        responses: &[AgentResult],
        personas: &[Persona],
    ) -> Vec<FollowUpQuestion> {
        let answers: Vec<(String, String)> = responses
            .iter()
            .filter(|r| r.is_usable())
            .map(|r| {
                (
                    persona_name(&r.persona_id, personas).to_string(),
                    r.response.clone(),
                )
            })
            .collect();

        let reply = match self
            .gateway
            .generate(
                &JuryPromptTemplate::follow_up_system(personas),
                &JuryPromptTemplate::follow_up_prompt(question, &answers),
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Follow-up generation failed: {}", e);
                return Vec::new();
            }
        };

        match parse_follow_up_questions(&reply, personas) {
            Ok(questions) => {
                info!("Moderator generated {} follow-up(s)", questions.len());
                questions
            }
            Err(e) => {
                warn!("Could not parse follow-ups: {}", e);
                Vec::new()
            }
        }
    }

    /// Final verdict text, or a fallback naming the error.
    pub async fn synthesize_verdict(
        &self,
        question: &str,
        interactions: &[TrialInteraction],
        personas: &[Persona],
    ) -> String {
        let transcript = format_transcript(interactions, personas);
        match self
            .gateway
            .generate(
                JuryPromptTemplate::verdict_system(),
                &JuryPromptTemplate::verdict_prompt(question, &transcript),
            )
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Verdict generation failed: {}", e);
                format!("Unable to generate verdict due to an error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::use_cases::test_support::{Reply, SequenceGateway};

    fn jury() -> Vec<Persona> {
        vec![
            Persona::with_id("vc-id", "The VC", "", ""),
            Persona::with_id("eng-id", "The Engineer", "", ""),
        ]
    }

    fn moderator(replies: Vec<Reply>) -> (Moderator<SequenceGateway>, Arc<SequenceGateway>) {
        let gateway = Arc::new(SequenceGateway::new(replies));
        (Moderator::new(Arc::clone(&gateway)), gateway)
    }

    #[tokio::test]
    async fn test_round_limit_ignores_model() {
        let (moderator, gateway) = moderator(vec![Reply::text("CONTINUE")]);
        assert!(!moderator.should_continue(&[], 5, &jury()).await);
        assert!(!moderator.should_continue(&[], 7, &jury()).await);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_continue_parsed_from_reply() {
        let (moderator, _) = moderator(vec![
            Reply::text("  continue - the engineer was vague"),
            Reply::text("STOP, we have enough"),
        ]);
        assert!(moderator.should_continue(&[], 1, &jury()).await);
        assert!(!moderator.should_continue(&[], 2, &jury()).await);
    }

    #[tokio::test]
    async fn test_continue_stops_on_error() {
        let (moderator, _) = moderator(vec![Reply::Fail(GatewayError::Timeout)]);
        assert!(!moderator.should_continue(&[], 1, &jury()).await);
    }

    #[tokio::test]
    async fn test_lower_round_limit() {
        let (moderator, gateway) = moderator(vec![]);
        let moderator = moderator.with_max_rounds(2);
        assert!(!moderator.should_continue(&[], 2, &jury()).await);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_follow_ups_resolved_by_name() {
        let (moderator, _) = moderator(vec![Reply::text(
            r#"Some text [ {"question":"Why?","targetPersonaName":"The VC","reasoning":"gap"} ] trailing junk"#,
        )]);
        let mut answer = AgentResult::loading("vc-id");
        answer.push_delta("It depends.");
        answer.finish();

        let questions = moderator
            .generate_follow_ups("Should we launch?", &[answer], &jury())
            .await;
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].target_persona_id, "vc-id");
    }

    #[tokio::test]
    async fn test_follow_ups_empty_on_garbage_or_error() {
        let (moderator, _) = moderator(vec![
            Reply::text("I have no questions."),
            Reply::Fail(GatewayError::Io("reset".into())),
        ]);
        assert!(moderator.generate_follow_ups("q", &[], &jury()).await.is_empty());
        assert!(moderator.generate_follow_ups("q", &[], &jury()).await.is_empty());
    }

    #[tokio::test]
    async fn test_verdict_fallback() {
        let (moderator, _) = moderator(vec![
            Reply::text("Launch in Q3."),
            Reply::Fail(GatewayError::RequestFailed("500".into())),
        ]);
        assert_eq!(
            moderator.synthesize_verdict("q", &[], &jury()).await,
            "Launch in Q3."
        );
        let fallback = moderator.synthesize_verdict("q", &[], &jury()).await;
        assert!(fallback.starts_with("Unable to generate verdict due to an error: "));
        assert!(fallback.contains("500"));
    }
}
