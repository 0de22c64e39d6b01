//! Persona domain.
//!
//! - [`entities::Persona`]: a configured "voice" that answers prompts
//! - [`roster::PersonaRoster`]: the caller-facing mutable persona list
//! - [`resolve`]: name/id resolution used when parsing moderator output

pub mod entities;
pub mod resolve;
pub mod roster;
