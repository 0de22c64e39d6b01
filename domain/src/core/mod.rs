//! Core domain concepts shared across all subdomains.
//!
//! - [`question::Question`]: a validated question to put to the jury
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: UTF-8 safe string helpers

pub mod error;
pub mod question;
pub mod string;
