//! Response streamer
//!
//! Turns one model call into a live sequence of [`StreamChunk`]s: retries
//! recoverable failures with backoff, then replays the reply in small
//! chunks so callers can render progress.

use super::stream_registry::StreamRegistry;
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use jury_domain::{Persona, RetryPolicy, StreamChunk, StreamStatus, split_into_chunks};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 32;

enum Interrupted {
    Cancelled,
    Failed(GatewayError),
}

/// Streams persona replies, one registry entry per call.
pub struct ResponseStreamer<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    registry: Arc<StreamRegistry>,
    retry: RetryPolicy,
    chunk_delay: Duration,
}

impl<G: LlmGateway + 'static> ResponseStreamer<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<StreamRegistry>) -> Self {
        Self {
            gateway,
            registry,
            retry: RetryPolicy::default(),
            chunk_delay: Duration::from_millis(200),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Start streaming `persona`'s reply to `prompt`.
    ///
    /// The returned receiver yields zero or more deltas followed by exactly
    /// one record with `is_complete` set. Cancelling `cancel` (or the
    /// registry entry) ends the stream with a "Stream was cancelled" record.
    pub fn stream(
        &self,
        prompt: &str,
        persona: &Persona,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<StreamChunk> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stream_id = Uuid::new_v4().to_string();
        let token = cancel.child_token();

        self.registry.register_for_persona(&stream_id, &persona.id);
        self.registry
            .register_cancel_handle(&stream_id, token.clone());

        let job = StreamJob {
            gateway: Arc::clone(&self.gateway),
            registry: Arc::clone(&self.registry),
            retry: self.retry,
            chunk_delay: self.chunk_delay,
            stream_id,
            system_instruction: persona.system_instruction.clone(),
            prompt: prompt.to_string(),
            token,
            tx,
        };
        tokio::spawn(job.run());
        rx
    }
}

struct StreamJob<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    registry: Arc<StreamRegistry>,
    retry: RetryPolicy,
    chunk_delay: Duration,
    stream_id: String,
    system_instruction: String,
    prompt: String,
    token: CancellationToken,
    tx: mpsc::Sender<StreamChunk>,
}

impl<G: LlmGateway + 'static> StreamJob<G> {
    async fn run(self) {
        self.registry
            .update_status(&self.stream_id, StreamStatus::Streaming);

        match self.generate_with_retry().await {
            Ok(text) => self.replay(&text).await,
            Err(Interrupted::Cancelled) => self.finish_cancelled().await,
            Err(Interrupted::Failed(e)) => {
                warn!("Stream {} failed: {}", self.stream_id, e);
                if e.classify().is_fatal() {
                    self.registry.cancel(&self.stream_id);
                } else {
                    self.registry
                        .update_status(&self.stream_id, StreamStatus::Error);
                }
                let _ = self
                    .tx
                    .send(StreamChunk::failed(&self.stream_id, e.user_message()))
                    .await;
            }
        }

        self.registry.cleanup(&self.stream_id);
    }

    async fn generate_with_retry(&self) -> Result<String, Interrupted> {
        let mut attempt = 1;
        loop {
            if self.token.is_cancelled() {
                return Err(Interrupted::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(Interrupted::Cancelled),
                r = self.gateway.generate(&self.system_instruction, &self.prompt) => r,
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if self.retry.should_retry(attempt, e.classify()) => {
                    let delay = self.retry.calculate_retry_delay(attempt);
                    warn!(
                        "Stream {} attempt {} failed ({}), retrying in {:?}",
                        self.stream_id, attempt, e, delay
                    );
                    tokio::select! {
                        biased;
                        _ = self.token.cancelled() => return Err(Interrupted::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(Interrupted::Failed(e)),
            }
        }
    }

    async fn replay(&self, text: &str) {
        let chunks = split_into_chunks(text);
        debug!("Stream {} replaying {} chunks", self.stream_id, chunks.len());

        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep(self.chunk_delay) => {}
                }
            }
            if self.token.is_cancelled() {
                self.finish_cancelled().await;
                return;
            }
            if self
                .tx
                .send(StreamChunk::delta(&self.stream_id, chunk))
                .await
                .is_err()
            {
                // Receiver gone
                self.registry.cancel(&self.stream_id);
                return;
            }
        }

        self.registry
            .update_status(&self.stream_id, StreamStatus::Completed);
        let _ = self.tx.send(StreamChunk::completed(&self.stream_id)).await;
    }

    async fn finish_cancelled(&self) {
        debug!("Stream {} cancelled", self.stream_id);
        self.registry
            .update_status(&self.stream_id, StreamStatus::Cancelled);
        let _ = self.tx.send(StreamChunk::cancelled(&self.stream_id)).await;
    }
}
