//! Stream chunks and simulated incremental delivery

use serde::{Deserialize, Serialize};

/// Error text carried by the final chunk of a cancelled stream
pub const CANCELLED_MESSAGE: &str = "Stream was cancelled";

/// One record of a generation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    pub stream_id: String,
    pub content_delta: String,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamChunk {
    pub fn delta(stream_id: &str, content_delta: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            content_delta: content_delta.into(),
            is_complete: false,
            error: None,
        }
    }

    pub fn completed(stream_id: &str) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            content_delta: String::new(),
            is_complete: true,
            error: None,
        }
    }

    pub fn failed(stream_id: &str, error: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            content_delta: String::new(),
            is_complete: true,
            error: Some(error.into()),
        }
    }

    pub fn cancelled(stream_id: &str) -> Self {
        Self::failed(stream_id, CANCELLED_MESSAGE)
    }
}

/// Split `text` into chunks of 2, 3, then 4 words, repeating.
///
/// Chunks after the first carry their leading space, so concatenating
/// all chunks reproduces `text` exactly.
pub fn split_into_chunks(text: &str) -> Vec<String> {
    const SIZES: [usize; 3] = [2, 3, 4];

    let words: Vec<&str> = text.split(' ').collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut size_idx = 0;

    while start < words.len() {
        let end = (start + SIZES[size_idx % SIZES.len()]).min(words.len());
        let mut chunk = words[start..end].join(" ");
        if start > 0 {
            chunk.insert(0, ' ');
        }
        chunks.push(chunk);
        start = end;
        size_idx += 1;
    }

    if text.is_empty() {
        chunks.clear();
    }
    chunks
}
