//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers.

use async_trait::async_trait;
use jury_domain::ErrorClass;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Retry/cancel classification of this error
    pub fn classify(&self) -> ErrorClass {
        match self {
            GatewayError::ConnectionError(_) | GatewayError::Timeout | GatewayError::Io(_) => {
                ErrorClass::Recoverable
            }
            GatewayError::Unauthorized(_)
            | GatewayError::Forbidden(_)
            | GatewayError::InvalidArgument(_) => ErrorClass::Fatal,
            GatewayError::RateLimited(_)
            | GatewayError::RequestFailed(_)
            | GatewayError::Other(_) => ErrorClass::Other,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Timeout => {
                "Connection timed out. Please check your internet connection and try again."
                    .to_string()
            }
            GatewayError::ConnectionError(_) => {
                "Unable to connect to the service. Please check your internet connection."
                    .to_string()
            }
            GatewayError::Io(_) => "Network error occurred. Please try again.".to_string(),
            GatewayError::RateLimited(_) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            GatewayError::Unauthorized(_) | GatewayError::Forbidden(_) => {
                "Authentication failed. Please check your API key.".to_string()
            }
            GatewayError::InvalidArgument(detail) => {
                format!("The request was rejected as invalid: {}", detail)
            }
            GatewayError::RequestFailed(_) => {
                "API service error. Please try again later.".to_string()
            }
            GatewayError::Other(detail) => format!("An unexpected error occurred: {}", detail),
        }
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Run `prompt` under `system_instruction` and return the full reply text.
    async fn generate(&self, system_instruction: &str, prompt: &str)
    -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(GatewayError::Timeout.classify(), ErrorClass::Recoverable);
        assert_eq!(
            GatewayError::ConnectionError("refused".into()).classify(),
            ErrorClass::Recoverable
        );
        assert_eq!(GatewayError::Io("reset".into()).classify(), ErrorClass::Recoverable);
        assert_eq!(
            GatewayError::Unauthorized("bad key".into()).classify(),
            ErrorClass::Fatal
        );
        assert_eq!(GatewayError::Forbidden("no".into()).classify(), ErrorClass::Fatal);
        assert_eq!(
            GatewayError::InvalidArgument("prompt".into()).classify(),
            ErrorClass::Fatal
        );
        assert_eq!(
            GatewayError::RateLimited("429".into()).classify(),
            ErrorClass::Other
        );
        assert_eq!(GatewayError::Other("?".into()).classify(), ErrorClass::Other);
    }

    #[test]
    fn test_user_message() {
        assert!(GatewayError::Unauthorized("x".into())
            .user_message()
            .contains("API key"));
        assert!(GatewayError::Other("boom".into())
            .user_message()
            .ends_with("boom"));
    }
}
