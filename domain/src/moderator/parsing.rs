//! Moderator reply parsing.
//!
//! Pure functions that turn free-form moderator replies into decisions.
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`parse_continue_decision`] | continue/stop reply | `bool` |
//! | [`extract_json_array`] | any reply | text between first `[` and last `]` |
//! | [`parse_follow_up_questions`] | follow-up reply | resolved [`FollowUpQuestion`]s |

use crate::core::error::DomainError;
use crate::persona::entities::Persona;
use crate::persona::resolve::resolve_persona_id;
use crate::trial::value_objects::FollowUpQuestion;
use serde::Deserialize;

/// True iff the trimmed reply starts with `CONTINUE` (any case).
pub fn parse_continue_decision(reply: &str) -> bool {
    reply
        .trim_start()
        .get(..8)
        .is_some_and(|head| head.eq_ignore_ascii_case("CONTINUE"))
}

/// Substring from the first `[` to the last `]`, inclusive.
pub fn extract_json_array(reply: &str) -> Option<&str> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    (end > start).then(|| &reply[start..=end])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFollowUp {
    question: Option<String>,
    target_persona_name: Option<String>,
    target_persona_id: Option<String>,
    reasoning: Option<String>,
}

/// Parse the moderator's follow-up reply.
///
/// Entries missing `question`, a target, or `reasoning` are skipped.
/// `targetPersonaName` wins over the legacy `targetPersonaId` key; either
/// is resolved through [`resolve_persona_id`].
///
/// Returns an error when no JSON array can be found or it does not parse;
/// callers treat that as "no follow-ups".
pub fn parse_follow_up_questions(
    reply: &str,
    personas: &[Persona],
) -> Result<Vec<FollowUpQuestion>, DomainError> {
    let json = extract_json_array(reply)
        .ok_or_else(|| DomainError::MalformedFollowUps("no JSON array in reply".to_string()))?;
    let raw: Vec<RawFollowUp> = serde_json::from_str(json)
        .map_err(|e| DomainError::MalformedFollowUps(e.to_string()))?;

    Ok(raw
        .into_iter()
        .filter_map(|entry| {
            let target = entry.target_persona_name.or(entry.target_persona_id)?;
            let question = entry.question?;
            let reasoning = entry.reasoning?;
            Some(FollowUpQuestion::new(
                question,
                resolve_persona_id(&target, personas),
                reasoning,
            ))
        })
        .collect())
}
