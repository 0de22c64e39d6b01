//! Application-level configuration.
//!
//! - [`TrialParams`]: deliberation limits, timeouts and stream pacing

pub mod trial_params;

pub use trial_params::{MAX_ROUNDS_CEILING, TrialParams};
