//! Transcript rendering for moderator prompts

use super::entities::{InteractionType, TrialInteraction, MODERATOR_SPEAKER, SYSTEM_SPEAKER};
use crate::persona::entities::Persona;
use crate::persona::resolve::persona_name;

/// Human-readable label for a speaker id.
pub fn speaker_label<'a>(speaker: &'a str, personas: &'a [Persona]) -> &'a str {
    match speaker {
        MODERATOR_SPEAKER => "Moderator",
        SYSTEM_SPEAKER => "System",
        id => persona_name(id, personas),
    }
}

fn type_label(interaction_type: InteractionType) -> &'static str {
    match interaction_type {
        InteractionType::InitialQuestion => "Question",
        InteractionType::InitialResponse => "Answer",
        InteractionType::FollowUpQuestion => "Follow-up",
        InteractionType::FollowUpResponse => "Follow-up answer",
        InteractionType::Verdict => "Verdict",
    }
}

/// Render interactions as a plain-text transcript, one block per entry.
///
/// ```text
/// [Round 2] Moderator (Follow-up -> The VC): Why?
/// ```
pub fn format_transcript(interactions: &[TrialInteraction], personas: &[Persona]) -> String {
    let mut out = String::new();
    for interaction in interactions {
        let speaker = speaker_label(&interaction.speaker, personas);
        let kind = type_label(interaction.interaction_type);
        let header = match &interaction.target_persona {
            Some(target) => format!(
                "[Round {}] {} ({} -> {})",
                interaction.round_number,
                speaker,
                kind,
                persona_name(target, personas)
            ),
            None => format!("[Round {}] {} ({})", interaction.round_number, speaker, kind),
        };
        out.push_str(&header);
        out.push_str(": ");
        out.push_str(interaction.content.trim());
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}
