//! Trial persistence adapters for the
//! [`TrialRepository`](jury_application::TrialRepository) port.
//!
//! - [`SqliteTrialRepository`]: durable, one database file per user
//! - [`InMemoryTrialRepository`]: process-local, used for `--ephemeral` runs

mod memory;
mod sqlite;

pub use memory::InMemoryTrialRepository;
pub use sqlite::SqliteTrialRepository;
