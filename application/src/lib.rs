//! Application layer for the-jury
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{MAX_ROUNDS_CEILING, TrialParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway},
    trial_repository::{RepositoryError, TrialRepository},
};
pub use use_cases::conduct_trial::{
    NO_INITIAL_RESPONSES, QUESTION_NOT_RECORDED, STOPPED_BY_USER, TrialOrchestrator,
    VERDICT_NOT_RECORDED,
};
pub use use_cases::moderator::Moderator;
pub use use_cases::persona_runner::PersonaRunner;
pub use use_cases::response_streamer::ResponseStreamer;
pub use use_cases::stream_registry::StreamRegistry;
pub use use_cases::summon_jury::SummonJury;
pub use use_cases::trial_store::{TrialStore, TrialStoreError};
