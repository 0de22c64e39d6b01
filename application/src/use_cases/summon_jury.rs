//! Summon the jury
//!
//! Puts one question to every persona at once and streams their answers
//! side by side. No moderator, no rounds, nothing is stored.

use super::persona_runner::PersonaRunner;
use super::response_streamer::ResponseStreamer;
use super::stream_registry::StreamRegistry;
use crate::config::TrialParams;
use crate::ports::llm_gateway::LlmGateway;
use jury_domain::{AgentResult, JuryPromptTemplate, Persona, Question};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One-shot parallel answers from the whole jury
pub struct SummonJury<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    params: TrialParams,
}

impl<G: LlmGateway + 'static> SummonJury<G> {
    pub fn new(gateway: Arc<G>, params: TrialParams) -> Self {
        Self { gateway, params }
    }

    /// Ask every persona `question` concurrently.
    ///
    /// Each item is the full result list after one update; the channel
    /// closes when every persona has finished. Cancelling `cancel` ends
    /// the remaining streams with an error, keeping any partial text.
    pub fn summon(
        &self,
        question: &Question,
        personas: &[Persona],
        cancel: &CancellationToken,
    ) -> mpsc::UnboundedReceiver<Vec<AgentResult>> {
        let streamer =
            ResponseStreamer::new(Arc::clone(&self.gateway), Arc::new(StreamRegistry::new()))
                .with_retry(self.params.retry)
                .with_chunk_delay(self.params.chunk_delay);
        let runner = PersonaRunner::new(Arc::new(streamer));

        info!("Summoning {} persona(s)", personas.len());
        let prompt = JuryPromptTemplate::initial_query(question.content());
        runner.run_many(&prompt, personas, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::use_cases::test_support::{Reply, RoutedGateway};
    use std::time::Duration;

    fn jury() -> Vec<Persona> {
        vec![
            Persona::with_id("vc", "The VC", "", "vc"),
            Persona::with_id("mom", "The Mom", "", "mom"),
        ]
    }

    async fn last_snapshot(mut rx: mpsc::UnboundedReceiver<Vec<AgentResult>>) -> Vec<AgentResult> {
        let mut last = Vec::new();
        while let Some(results) = rx.recv().await {
            last = results;
        }
        last
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_persona_answers_the_question() {
        let gateway = Arc::new(RoutedGateway::new(|system, prompt| {
            Reply::Text(format!("{}: {}", system, prompt))
        }));
        let params = TrialParams::default().with_chunk_delay(Duration::from_millis(1));
        let summon = SummonJury::new(Arc::clone(&gateway), params);
        let question = Question::parse("Bakery?").unwrap();

        let results =
            last_snapshot(summon.summon(&question, &jury(), &CancellationToken::new())).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_usable()));
        assert_eq!(results[0].response, "vc: Bakery?");
        assert_eq!(results[1].response, "mom: Bakery?");
        assert_eq!(gateway.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_does_not_hide_the_rest() {
        let gateway = RoutedGateway::new(|system, _| match system {
            "mom" => Reply::Fail(GatewayError::InvalidArgument("bad".into())),
            _ => Reply::text("Scale it."),
        });
        let summon = SummonJury::new(
            Arc::new(gateway),
            TrialParams::default().with_chunk_delay(Duration::from_millis(1)),
        );
        let question = Question::parse("Bakery?").unwrap();

        let results =
            last_snapshot(summon.summon(&question, &jury(), &CancellationToken::new())).await;

        assert!(results[0].is_usable());
        assert!(!results[1].is_loading);
        assert!(results[1].error.is_some());
    }

    #[tokio::test]
    async fn test_cancel_ends_hanging_answers() {
        let summon = SummonJury::new(
            Arc::new(RoutedGateway::new(|_, _| Reply::Hang)),
            TrialParams::default(),
        );
        let question = Question::parse("Bakery?").unwrap();
        let token = CancellationToken::new();
        let rx = summon.summon(&question, &jury(), &token);
        token.cancel();

        let results = last_snapshot(rx).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_loading && r.error.is_some()));
    }
}
