//! Gemini adapter for the [`LlmGateway`](jury_application::LlmGateway) port.
//!
//! Talks to the `generateContent` REST endpoint. One request per call; the
//! application layer handles retries and chunked display.

mod gateway;
mod protocol;

pub use gateway::{GeminiConfig, GeminiGateway};
