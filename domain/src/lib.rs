//! Domain layer for the-jury
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Trial
//!
//! A trial puts one question to a jury of personas. A moderator gathers
//! their initial answers, asks targeted follow-up questions for up to five
//! rounds, then writes a verdict.
//!
//! ## Streams
//!
//! Each persona answer is produced by one generation stream, delivered as
//! [`StreamChunk`]s and retried according to a [`RetryPolicy`].

pub mod config;
pub mod core;
pub mod moderator;
pub mod persona;
pub mod prompt;
pub mod stream;
pub mod trial;

// Re-export commonly used types
pub use config::OutputFormat;
pub use core::{error::DomainError, question::Question};
pub use moderator::parsing::{
    extract_json_array, parse_continue_decision, parse_follow_up_questions,
};
pub use persona::{
    entities::Persona,
    resolve::{persona_name, resolve_persona_id},
    roster::PersonaRoster,
};
pub use prompt::JuryPromptTemplate;
pub use stream::{
    chunk::{CANCELLED_MESSAGE, StreamChunk, split_into_chunks},
    retry::{ErrorClass, RetryPolicy},
    status::StreamStatus,
};
pub use trial::{
    entities::{
        InteractionType, MODERATOR_SPEAKER, SYSTEM_SPEAKER, Trial, TrialInteraction, TrialStatus,
    },
    transcript::{format_transcript, speaker_label},
    value_objects::{AgentResult, FollowUpQuestion, TrialState},
};
