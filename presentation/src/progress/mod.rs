//! Live progress while a trial runs
//!
//! Snapshots arrive from the orchestrator; reporters draw them on stderr so
//! stdout carries only the final rendering.

pub mod reporter;
pub mod tracker;
