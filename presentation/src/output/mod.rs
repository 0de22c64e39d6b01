//! Terminal rendering of trials

pub mod console;
