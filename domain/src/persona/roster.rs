//! Persona roster: the editable list a caller picks a jury from.

use super::entities::Persona;
use crate::core::error::DomainError;

/// Mutable, ordered list of personas (Entity)
///
/// Trials never hold a roster; they receive a [`snapshot`](Self::snapshot).
#[derive(Debug, Clone, Default)]
pub struct PersonaRoster {
    personas: Vec<Persona>,
}

impl PersonaRoster {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    /// Roster seeded with [`Persona::defaults`]
    pub fn with_defaults() -> Self {
        Self::new(Persona::defaults())
    }

    pub fn add(&mut self, persona: Persona) {
        self.personas.push(persona);
    }

    /// Replace the persona with the same id. Returns false if absent.
    pub fn update(&mut self, persona: Persona) -> bool {
        match self.personas.iter_mut().find(|p| p.id == persona.id) {
            Some(slot) => {
                *slot = persona;
                true
            }
            None => false,
        }
    }

    /// Remove a persona by id. Returns false if absent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.personas.len();
        self.personas.retain(|p| p.id != id);
        self.personas.len() != before
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Persona> {
        self.personas
            .iter()
            .find(|p| p.name.to_lowercase() == name.trim().to_lowercase())
    }

    /// Select personas by name, preserving the requested order.
    pub fn select(&self, names: &[String]) -> Result<Vec<Persona>, DomainError> {
        names
            .iter()
            .map(|name| {
                self.find_by_name(name)
                    .cloned()
                    .ok_or_else(|| DomainError::UnknownPersona(name.clone()))
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Persona> {
        self.personas.clone()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }
}
