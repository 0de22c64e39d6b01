//! Generation streams: status, chunks and retry policy.

pub mod chunk;
pub mod retry;
pub mod status;
