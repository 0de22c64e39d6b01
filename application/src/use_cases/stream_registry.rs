//! Stream registry
//!
//! Tracks the status and cancellation token of every in-flight generation
//! stream. One mutex guards all entries, so status and token never disagree.

use jury_domain::StreamStatus;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
struct StreamEntry {
    status: StreamStatus,
    cancel: Option<CancellationToken>,
    persona_id: Option<String>,
}

/// Thread-safe registry of generation streams.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    entries: Mutex<HashMap<String, StreamEntry>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StreamEntry>> {
        // A poisoned map is still structurally valid
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start tracking a stream in `STARTING`.
    pub fn register(&self, stream_id: &str) {
        self.register_with_status(stream_id, StreamStatus::Starting, None);
    }

    /// Start tracking a stream owned by `persona_id`.
    pub fn register_for_persona(&self, stream_id: &str, persona_id: &str) {
        self.register_with_status(
            stream_id,
            StreamStatus::Starting,
            Some(persona_id.to_string()),
        );
    }

    pub fn register_with_status(
        &self,
        stream_id: &str,
        status: StreamStatus,
        persona_id: Option<String>,
    ) {
        self.lock().insert(
            stream_id.to_string(),
            StreamEntry {
                status,
                cancel: None,
                persona_id,
            },
        );
    }

    /// Update a stream's status. Returns false when the stream is unknown or
    /// the transition is not allowed.
    pub fn update_status(&self, stream_id: &str, status: StreamStatus) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(stream_id) {
            Some(entry) if entry.status.can_transition_to(status) => {
                entry.status = status;
                true
            }
            Some(entry) => {
                debug!(
                    "Ignoring stream {} transition {} -> {}",
                    stream_id, entry.status, status
                );
                false
            }
            None => false,
        }
    }

    pub fn get_status(&self, stream_id: &str) -> Option<StreamStatus> {
        self.lock().get(stream_id).map(|e| e.status)
    }

    pub fn register_cancel_handle(&self, stream_id: &str, handle: CancellationToken) {
        if let Some(entry) = self.lock().get_mut(stream_id) {
            entry.cancel = Some(handle);
        }
    }

    /// Cancel a stream: trip its token and mark it `CANCELLED`.
    ///
    /// Returns false when the stream is absent or already terminal.
    pub fn cancel(&self, stream_id: &str) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(stream_id) else {
            return false;
        };
        if entry.status.is_terminal() {
            return false;
        }
        if let Some(token) = &entry.cancel {
            token.cancel();
        }
        entry.status = StreamStatus::Cancelled;
        debug!("Cancelled stream {}", stream_id);
        true
    }

    /// Cancel every non-terminal stream owned by `persona_id`.
    ///
    /// Returns how many streams were cancelled.
    pub fn cancel_persona(&self, persona_id: &str) -> usize {
        let ids: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, e)| e.persona_id.as_deref() == Some(persona_id))
            .map(|(id, _)| id.clone())
            .collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    /// Stop tracking a stream. Idempotent.
    pub fn cleanup(&self, stream_id: &str) {
        self.lock().remove(stream_id);
    }

    /// Status of every tracked stream.
    pub fn list_active(&self) -> HashMap<String, StreamStatus> {
        self.lock()
            .iter()
            .map(|(id, e)| (id.clone(), e.status))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}
