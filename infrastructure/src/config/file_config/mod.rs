//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application types
//! once [`FileConfig::validate`] has passed.

mod logging;
mod model;
mod output;
mod personas;
mod storage;
mod trial;

pub use logging::FileLoggingConfig;
pub use model::FileModelConfig;
pub use output::FileOutputConfig;
pub use personas::FilePersonaConfig;
pub use storage::FileStorageConfig;
pub use trial::{FileRetryConfig, FileTrialConfig};

use jury_application::{MAX_ROUNDS_CEILING, TrialParams};
use jury_domain::PersonaRoster;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("trial.max_rounds must be between 1 and {MAX_ROUNDS_CEILING}, got {0}")]
    InvalidMaxRounds(u32),

    #[error("retry.max_attempts cannot be 0")]
    InvalidMaxAttempts,

    #[error("model name cannot be empty")]
    EmptyModelName,

    #[error("persona #{0} has an empty name")]
    EmptyPersonaName(usize),

    #[error("duplicate persona name: {0}")]
    DuplicatePersonaName(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Generation provider settings
    pub model: FileModelConfig,
    /// Deliberation limits and delays
    pub trial: FileTrialConfig,
    /// Backoff for model calls
    pub retry: FileRetryConfig,
    /// Trial persistence
    pub storage: FileStorageConfig,
    /// Log and transcript destinations
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Jury members; built-in personas are used when empty
    pub personas: Vec<FilePersonaConfig>,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.model.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        if self.model.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "model.request_timeout_secs",
            ));
        }

        self.trial.validate()?;

        if self.retry.max_attempts == 0 {
            return Err(ConfigValidationError::InvalidMaxAttempts);
        }

        let mut seen: Vec<String> = Vec::with_capacity(self.personas.len());
        for (index, persona) in self.personas.iter().enumerate() {
            let name = persona.name.trim();
            if name.is_empty() {
                return Err(ConfigValidationError::EmptyPersonaName(index + 1));
            }
            let lowered = name.to_lowercase();
            if seen.contains(&lowered) {
                return Err(ConfigValidationError::DuplicatePersonaName(
                    name.to_string(),
                ));
            }
            seen.push(lowered);
        }
        Ok(())
    }

    /// Deliberation parameters for the orchestrator
    pub fn trial_params(&self) -> TrialParams {
        TrialParams::default()
            .with_max_rounds(self.trial.max_rounds)
            .with_initial_timeout(self.trial.initial_timeout())
            .with_follow_up_timeout(self.trial.follow_up_timeout())
            .with_chunk_delay(self.trial.chunk_delay())
            .with_retry(self.retry.to_policy())
    }

    /// Configured personas, or the built-in jury when none are configured
    pub fn roster(&self) -> PersonaRoster {
        if self.personas.is_empty() {
            return PersonaRoster::with_defaults();
        }
        PersonaRoster::new(
            self.personas
                .iter()
                .map(FilePersonaConfig::to_persona)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trial_params(), TrialParams::default());
        assert_eq!(config.roster().len(), 3);
    }

    #[test]
    fn test_full_toml_round_into_params() {
        let toml_str = r#"
[model]
model = "gemini-2.5-pro"

[trial]
max_rounds = 3
initial_timeout_secs = 60
follow_up_timeout_secs = 10
chunk_delay_ms = 0

[retry]
base_delay_ms = 500
max_delay_ms = 4000
max_attempts = 5

[[personas]]
name = "The Skeptic"
description = "Doubts everything"
system_instruction = "You are a skeptic."

[[personas]]
id = "optimist"
name = "The Optimist"
system_instruction = "You are an optimist."
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        let params = config.trial_params();
        assert_eq!(params.max_rounds, 3);
        assert_eq!(params.initial_timeout, Duration::from_secs(60));
        assert_eq!(params.follow_up_timeout, Duration::from_secs(10));
        assert_eq!(params.chunk_delay, Duration::ZERO);
        assert_eq!(params.retry.base_delay, Duration::from_millis(500));
        assert_eq!(params.retry.max_attempts, 5);

        let roster = config.roster();
        let personas = roster.snapshot();
        assert_eq!(personas.len(), 2);
        assert_eq!(personas[0].id, "the-skeptic");
        assert_eq!(personas[1].id, "optimist");
        assert_eq!(personas[1].description, "");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = FileConfig::default();
        config.trial.initial_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidTimeout(
                "trial.initial_timeout_secs"
            ))
        );

        let mut config = FileConfig::default();
        config.model.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_round_bounds_rejected() {
        let mut config = FileConfig::default();
        config.trial.max_rounds = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidMaxRounds(0))
        );
        config.trial.max_rounds = 6;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidMaxRounds(6))
        );
        config.trial.max_rounds = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_persona_name_rejected() {
        let toml_str = r#"
[[personas]]
name = "   "
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::EmptyPersonaName(1))
        );
    }

    #[test]
    fn test_duplicate_persona_name_rejected() {
        let toml_str = r#"
[[personas]]
name = "Judge"

[[personas]]
name = "judge"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicatePersonaName("judge".to_string()))
        );
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = FileConfig::default();
        config.model.model = String::new();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyModelName));
    }
}
