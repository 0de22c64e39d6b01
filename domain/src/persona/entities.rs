//! Persona entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A jury member (Entity)
///
/// A persona is immutable once created. Trials take a snapshot of the
/// persona list at start, so later edits never affect a running trial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Unique, stable identifier
    pub id: String,
    /// Display name, also used by the moderator to address the persona
    pub name: String,
    /// Short human-readable description
    pub description: String,
    /// System instruction sent with every prompt for this persona
    pub system_instruction: String,
}

impl Persona {
    /// Create a persona with a freshly generated id
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            name,
            description,
            system_instruction,
        )
    }

    /// Create a persona with an explicit id
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            system_instruction: system_instruction.into(),
        }
    }

    /// The three personas every fresh installation starts with.
    pub fn defaults() -> Vec<Persona> {
        vec![
            Persona::new(
                "The VC",
                "A venture capitalist looking for ROI and scale.",
                "You are a seasoned Venture Capitalist from Silicon Valley. You are skeptical, \
                 focused on 'Unfair Advantage', 'TAM' (Total Addressable Market), and 'Unit \
                 Economics'. You are critical of ideas that don't scale effortlessly. Your name \
                 is 'The VC'.",
            ),
            Persona::new(
                "The Engineer",
                "A pragmatic software architect.",
                "You are a pragmatic Senior Software Engineer. You care about technical \
                 feasibility, debt, complexity, and maintainability. You hate buzzwords. You ask \
                 'How will this actually work?' Your name is 'The Engineer'.",
            ),
            Persona::new(
                "The Mom",
                "A supportive but practical non-tech user.",
                "You are a regular person, a mom who just wants things to be simple, safe, and \
                 useful. You don't care about tech specs. You ask 'Is this safe? Is it easy? \
                 Will it help me?' Your name is 'The Mom'.",
            ),
        ]
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let a = Persona::new("A", "", "");
        let b = Persona::new("A", "", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_defaults() {
        let defaults = Persona::defaults();
        let names: Vec<_> = defaults.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["The VC", "The Engineer", "The Mom"]);
        assert!(defaults.iter().all(|p| !p.system_instruction.is_empty()));
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let persona = Persona::with_id("p1", "The VC", "desc", "be a vc");
        let json = serde_json::to_value(&persona).unwrap();
        assert_eq!(json["systemInstruction"], "be a vc");
        let back: Persona = serde_json::from_value(json).unwrap();
        assert_eq!(back, persona);
    }
}
