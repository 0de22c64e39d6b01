//! Trial domain.
//!
//! A trial is one deliberation session: a question, a fixed persona set,
//! and the append-only transcript produced while answering it.
//!
//! - [`entities::Trial`]: the aggregate, with its status state machine
//! - [`entities::TrialInteraction`]: one transcript entry
//! - [`value_objects`]: transient per-run values (snapshots, agent results)
//! - [`transcript`]: human-readable transcript rendering for prompts

pub mod entities;
pub mod transcript;
pub mod value_objects;
