//! Persona runner
//!
//! Fans one prompt out to several personas and publishes a merged live
//! view of their answers.

use super::response_streamer::ResponseStreamer;
use crate::ports::llm_gateway::LlmGateway;
use jury_domain::{AgentResult, Persona, StreamChunk};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result list plus the channel its snapshots go out on.
///
/// Updating and sending happen under the same lock, so every snapshot is
/// a consistent view and snapshots arrive in update order.
struct SharedResults {
    results: Vec<AgentResult>,
    tx: mpsc::UnboundedSender<Vec<AgentResult>>,
}

impl SharedResults {
    fn apply(&mut self, index: usize, chunk: &StreamChunk) {
        let Some(entry) = self.results.get_mut(index) else {
            return;
        };
        apply_chunk(entry, chunk);
        let _ = self.tx.send(self.results.clone());
    }
}

fn apply_chunk(entry: &mut AgentResult, chunk: &StreamChunk) {
    entry.push_delta(&chunk.content_delta);
    if chunk.is_complete {
        match &chunk.error {
            Some(error) => entry.fail(error.clone()),
            None => entry.finish(),
        }
    }
}

/// Runs prompts against personas through a [`ResponseStreamer`].
pub struct PersonaRunner<G: LlmGateway + 'static> {
    streamer: Arc<ResponseStreamer<G>>,
}

impl<G: LlmGateway + 'static> Clone for PersonaRunner<G> {
    fn clone(&self) -> Self {
        Self {
            streamer: Arc::clone(&self.streamer),
        }
    }
}

impl<G: LlmGateway + 'static> PersonaRunner<G> {
    pub fn new(streamer: Arc<ResponseStreamer<G>>) -> Self {
        Self { streamer }
    }

    /// Run `prompt` against every persona concurrently.
    ///
    /// The first snapshot has every persona loading with an empty response.
    /// Each later snapshot is the full list after one update. The channel
    /// closes once every persona has finished. An empty persona list yields
    /// no snapshots.
    pub fn run_many(
        &self,
        prompt: &str,
        personas: &[Persona],
        cancel: &CancellationToken,
    ) -> mpsc::UnboundedReceiver<Vec<AgentResult>> {
        let (tx, rx) = mpsc::unbounded_channel();
        if personas.is_empty() {
            return rx;
        }

        let results: Vec<AgentResult> = personas
            .iter()
            .map(|p| AgentResult::loading(p.id.clone()))
            .collect();
        let _ = tx.send(results.clone());
        let shared = Arc::new(Mutex::new(SharedResults { results, tx }));

        let mut join_set = JoinSet::new();
        for (index, persona) in personas.iter().enumerate() {
            let mut chunks = self.streamer.stream(prompt, persona, cancel);
            let shared = Arc::clone(&shared);
            let persona_id = persona.id.clone();

            join_set.spawn(async move {
                let mut finished = false;
                while let Some(chunk) = chunks.recv().await {
                    finished = chunk.is_complete;
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    guard.apply(index, &chunk);
                }
                if !finished {
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    let ended = StreamChunk::failed("", "Stream ended unexpectedly");
                    guard.apply(index, &ended);
                }
                debug!("Persona {} finished", persona_id);
            });
        }
        drop(shared);

        tokio::spawn(async move {
            while let Some(joined) = join_set.join_next().await {
                if let Err(e) = joined {
                    warn!("Persona task join error: {}", e);
                }
            }
        });

        rx
    }

    /// Run `prompt` against a single persona.
    ///
    /// Yields the accumulated [`AgentResult`] after every chunk, starting
    /// with a loading entry.
    pub fn run_one(
        &self,
        prompt: &str,
        persona: &Persona,
        cancel: &CancellationToken,
    ) -> mpsc::UnboundedReceiver<AgentResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut result = AgentResult::loading(persona.id.clone());
        let _ = tx.send(result.clone());

        let mut chunks = self.streamer.stream(prompt, persona, cancel);
        tokio::spawn(async move {
            let mut finished = false;
            while let Some(chunk) = chunks.recv().await {
                finished = chunk.is_complete;
                apply_chunk(&mut result, &chunk);
                let _ = tx.send(result.clone());
            }
            if !finished {
                result.fail("Stream ended unexpectedly");
                let _ = tx.send(result);
            }
        });

        rx
    }

    /// Cancel every active stream owned by the given personas.
    ///
    /// Only streams started through this runner's registry are affected.
    ///
    /// Best effort: never fails, and one persona cannot stop the rest.
    pub fn cancel_all(&self, personas: &[Persona]) {
        let registry = self.streamer.registry();
        for persona in personas {
            let cancelled = registry.cancel_persona(&persona.id);
            if cancelled > 0 {
                debug!("Cancelled {} stream(s) for {}", cancelled, persona.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::use_cases::stream_registry::StreamRegistry;
    use crate::use_cases::test_support::{Reply, RoutedGateway};
    use std::time::Duration;

    fn jury() -> Vec<Persona> {
        vec![
            Persona::with_id("vc", "The VC", "", "vc"),
            Persona::with_id("eng", "The Engineer", "", "eng"),
            Persona::with_id("mom", "The Mom", "", "mom"),
        ]
    }

    fn runner(gateway: RoutedGateway) -> PersonaRunner<RoutedGateway> {
        let streamer = ResponseStreamer::new(Arc::new(gateway), Arc::new(StreamRegistry::new()))
            .with_chunk_delay(Duration::from_millis(5));
        PersonaRunner::new(Arc::new(streamer))
    }

    async fn drain<T>(mut rx: mpsc::UnboundedReceiver<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_many_two_succeed_one_fails() {
        let runner = runner(RoutedGateway::new(|system, _| match system {
            "mom" => Reply::Fail(GatewayError::Forbidden("no".into())),
            "vc" => Reply::text("Ship it if it scales to millions of users."),
            _ => Reply::text("Only after the load tests pass."),
        }));

        let snapshots = drain(runner.run_many(
            "Should we launch?",
            &jury(),
            &CancellationToken::new(),
        ))
        .await;

        let first = &snapshots[0];
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|r| r.is_loading && r.response.is_empty()));

        let last = snapshots.last().unwrap();
        assert_eq!(last.len(), 3);
        assert!(last.iter().all(|r| !r.is_loading));
        let answered: Vec<_> = last.iter().filter(|r| !r.response.is_empty()).collect();
        assert_eq!(answered.len(), 2);
        assert!(answered.iter().all(|r| r.error.is_none()));
        let failed: Vec<_> = last.iter().filter(|r| r.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].persona_id, "mom");
        assert_eq!(
            last[0].response,
            "Ship it if it scales to millions of users."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_are_never_torn() {
        let runner = runner(RoutedGateway::new(|_, _| {
            Reply::text("one two three four five six seven eight nine ten")
        }));
        let snapshots = drain(runner.run_many("q", &jury(), &CancellationToken::new())).await;

        // Each snapshot differs from the previous by at most one entry
        for pair in snapshots.windows(2) {
            let changed = pair[0]
                .iter()
                .zip(pair[1].iter())
                .filter(|(a, b)| a != b)
                .count();
            assert!(changed <= 1);
            // Text only grows
            for (a, b) in pair[0].iter().zip(pair[1].iter()) {
                assert!(b.response.starts_with(&a.response));
            }
        }
    }

    #[tokio::test]
    async fn test_empty_persona_list() {
        let runner = runner(RoutedGateway::new(|_, _| Reply::text("x")));
        let snapshots = drain(runner.run_many("q", &[], &CancellationToken::new())).await;
        assert!(snapshots.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_one() {
        let runner = runner(RoutedGateway::new(|_, prompt| Reply::Text(format!("re: {}", prompt))));
        let persona = Persona::with_id("vc", "The VC", "", "vc");
        let updates = drain(runner.run_one("Why?", &persona, &CancellationToken::new())).await;

        assert!(updates[0].is_loading);
        let last = updates.last().unwrap();
        assert!(last.is_usable());
        assert_eq!(last.response, "re: Why?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_text_kept_on_cancel() {
        let runner = runner(RoutedGateway::new(|_, _| {
            Reply::Text(vec!["word"; 50].join(" "))
        }));
        let persona = Persona::with_id("vc", "The VC", "", "vc");
        let token = CancellationToken::new();
        let mut rx = runner.run_one("q", &persona, &token);

        // Wait for some text to arrive
        loop {
            let update = rx.recv().await.unwrap();
            if !update.response.is_empty() {
                break;
            }
        }
        token.cancel();

        let mut last = None;
        while let Some(update) = rx.recv().await {
            last = Some(update);
        }
        let last = last.unwrap();
        assert!(!last.is_loading);
        assert!(last.error.is_some());
        assert!(last.response.starts_with("word word"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_hanging_personas() {
        let runner = runner(RoutedGateway::new(|_, _| Reply::Hang));
        let personas = jury();
        let rx = runner.run_many("q", &personas, &CancellationToken::new());

        runner.cancel_all(&personas);
        // Unknown persona is ignored
        runner.cancel_all(&[Persona::with_id("ghost", "Ghost", "", "")]);

        let snapshots = drain(rx).await;
        let last = snapshots.last().unwrap();
        assert!(last.iter().all(|r| r.error.is_some() && !r.is_loading));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_leaves_other_runners_alone() {
        let slow = |_: &str, _: &str| Reply::Delayed(Duration::from_secs(5), "Still here.".into());
        let first = runner(RoutedGateway::new(slow));
        let second = runner(RoutedGateway::new(slow));
        let personas = jury();

        let cancelled = first.run_many("q", &personas, &CancellationToken::new());
        let untouched = second.run_many("q", &personas, &CancellationToken::new());
        first.cancel_all(&personas);

        let cancelled = drain(cancelled).await;
        assert!(cancelled.last().unwrap().iter().all(|r| r.error.is_some()));

        let untouched = drain(untouched).await;
        let last = untouched.last().unwrap();
        assert!(last.iter().all(|r| r.is_usable()));
        assert!(last.iter().all(|r| r.response == "Still here."));
    }
}
