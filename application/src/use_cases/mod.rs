//! Use cases
//!
//! Leaves first: [`stream_registry`] → [`response_streamer`] →
//! [`persona_runner`] → [`moderator`] → [`trial_store`] → [`conduct_trial`].
//! [`summon_jury`] sits directly on [`persona_runner`].

pub mod conduct_trial;
pub mod moderator;
pub mod persona_runner;
pub mod response_streamer;
pub mod stream_registry;
pub mod summon_jury;
pub mod trial_store;

#[cfg(test)]
pub(crate) mod test_support;
