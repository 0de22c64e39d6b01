//! Jury member configuration from TOML (`[[personas]]` tables)

use jury_domain::Persona;
use serde::{Deserialize, Serialize};

/// Raw persona entry from TOML
///
/// ```toml
/// [[personas]]
/// name = "The Skeptic"
/// description = "Doubts everything"
/// system_instruction = "You are a professional skeptic..."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersonaConfig {
    /// Stable id; derived from the name when omitted
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub system_instruction: String,
}

impl FilePersonaConfig {
    pub fn to_persona(&self) -> Persona {
        let name = self.name.trim();
        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slug(name));
        Persona::with_id(
            id,
            name,
            self.description.clone(),
            self.system_instruction.clone(),
        )
    }
}

/// Lowercase, alphanumerics kept, every other run collapsed to `-`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("The VC"), "the-vc");
        assert_eq!(slug("  Dr. Strange!  "), "dr-strange");
        assert_eq!(slug("Épée"), "épée");
    }

    #[test]
    fn test_explicit_id_kept() {
        let config = FilePersonaConfig {
            id: Some("judge-1".to_string()),
            name: " Judge ".to_string(),
            ..Default::default()
        };
        let persona = config.to_persona();
        assert_eq!(persona.id, "judge-1");
        assert_eq!(persona.name, "Judge");
    }

    #[test]
    fn test_blank_id_falls_back_to_slug() {
        let config = FilePersonaConfig {
            id: Some("  ".to_string()),
            name: "The Mom".to_string(),
            ..Default::default()
        };
        assert_eq!(config.to_persona().id, "the-mom");
    }
}
