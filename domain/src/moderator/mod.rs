//! Moderator decision parsing

pub mod parsing;
