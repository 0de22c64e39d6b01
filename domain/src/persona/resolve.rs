//! Persona name/id resolution.
//!
//! The moderator addresses personas by name, while the transcript stores
//! persona ids. Resolution is deterministic, in this priority order:
//!
//! 1. exact id match
//! 2. case-insensitive name match
//! 3. the input, passed through verbatim

use super::entities::Persona;

/// Resolve a name-or-id reference to a persona id.
pub fn resolve_persona_id(name_or_id: &str, personas: &[Persona]) -> String {
    let needle = name_or_id.trim();
    if let Some(p) = personas.iter().find(|p| p.id == needle) {
        return p.id.clone();
    }
    let lowered = needle.to_lowercase();
    if let Some(p) = personas.iter().find(|p| p.name.to_lowercase() == lowered) {
        return p.id.clone();
    }
    needle.to_string()
}

/// Display name for a persona id, falling back to the id itself.
pub fn persona_name<'a>(persona_id: &'a str, personas: &'a [Persona]) -> &'a str {
    personas
        .iter()
        .find(|p| p.id == persona_id)
        .map(|p| p.name.as_str())
        .unwrap_or(persona_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jury() -> Vec<Persona> {
        vec![
            Persona::with_id("vc-1", "The VC", "", ""),
            Persona::with_id("eng-1", "The Engineer", "", ""),
        ]
    }

    #[test]
    fn test_exact_id_wins() {
        assert_eq!(resolve_persona_id("eng-1", &jury()), "eng-1");
    }

    #[test]
    fn test_case_insensitive_name() {
        assert_eq!(resolve_persona_id("the vc", &jury()), "vc-1");
        assert_eq!(resolve_persona_id("THE ENGINEER", &jury()), "eng-1");
    }

    #[test]
    fn test_unresolved_passthrough() {
        assert_eq!(resolve_persona_id("The Lawyer", &jury()), "The Lawyer");
    }

    #[test]
    fn test_id_takes_priority_over_name() {
        // A persona whose name equals another persona's id
        let personas = vec![
            Persona::with_id("alpha", "beta", "", ""),
            Persona::with_id("beta", "gamma", "", ""),
        ];
        assert_eq!(resolve_persona_id("beta", &personas), "beta");
    }

    #[test]
    fn test_persona_name_fallback() {
        let personas = jury();
        assert_eq!(persona_name("vc-1", &personas), "The VC");
        assert_eq!(persona_name("ghost", &personas), "ghost");
    }
}
