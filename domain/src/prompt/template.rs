//! Prompt templates for the jury flow

use crate::persona::entities::Persona;

/// Templates for generating prompts at each stage
pub struct JuryPromptTemplate;

impl JuryPromptTemplate {
    /// User prompt for the initial round, sent to every persona
    pub fn initial_query(question: &str) -> String {
        question.to_string()
    }

    /// System prompt for the continue/stop decision
    pub fn continue_system(max_rounds: u32) -> String {
        format!(
            r#"You are an intelligent moderator deciding whether a jury deliberation should continue or whether enough has been said for a final verdict.

Guidelines:
1. Consider whether personas still disagree on something important
2. Check whether important questions remain unanswered
3. Judge whether the answers are specific enough
4. Deliberation is limited to {} rounds

Reply with "CONTINUE" or "STOP" followed by a brief reasoning."#,
            max_rounds
        )
    }

    /// User prompt for the continue/stop decision
    pub fn continue_prompt(transcript: &str, round_count: u32, max_rounds: u32) -> String {
        format!(
            r#"Current round: {}/{}

Trial transcript:
{}

Should deliberation continue?"#,
            round_count, max_rounds, transcript
        )
    }

    /// System prompt for follow-up generation
    pub fn follow_up_system(personas: &[Persona]) -> String {
        let names: Vec<&str> = personas.iter().map(|p| p.name.as_str()).collect();
        format!(
            r#"You are an intelligent moderator facilitating a jury deliberation. Analyze the personas' answers and generate targeted follow-up questions that resolve conflicts, clarify vague points or fill gaps.

Guidelines:
1. Ask specific questions, not general ones
2. Focus on disagreements and incomplete answers
3. Do not ask what has already been answered
4. Address personas by their exact NAME from the list below

Available personas: {}

Reply with a JSON array in this format:
[
  {{
    "question": "Specific question text",
    "targetPersonaName": "exact persona name from the list above",
    "reasoning": "Why this question is needed"
  }}
]

If no follow-up is needed, reply with an empty array: []"#,
            names.join(", ")
        )
    }

    /// User prompt for follow-up generation.
    ///
    /// `responses` holds `(persona name, answer)` pairs.
    pub fn follow_up_prompt(question: &str, responses: &[(String, String)]) -> String {
        let mut prompt = format!("Original question: {}\n\nPersona responses:\n", question);
        for (name, answer) in responses {
            prompt.push_str(&format!("- {}: {}\n", name, answer.trim()));
        }
        prompt.push_str(
            "\nAnalyze these responses and generate follow-up questions if needed. \
             Use the exact persona names.",
        );
        prompt
    }

    /// Prompt sent to a persona asked a follow-up question
    pub fn persona_follow_up_prompt(original_question: &str, follow_up: &str) -> String {
        format!(
            r#"We are deliberating on this question: {}

The moderator asks you: {}

Answer the moderator's question directly."#,
            original_question, follow_up
        )
    }

    /// System prompt for the verdict
    pub fn verdict_system() -> &'static str {
        r#"You are an intelligent moderator writing the final verdict of a jury deliberation. Produce a comprehensive answer to the original question that incorporates every persona's insights.

Guidelines:
1. Answer the original question directly
2. Reference key points from personas BY NAME
3. Where personas disagree, present each view with its reasoning
4. End with a clear, well-reasoned conclusion"#
    }

    /// User prompt for the verdict
    pub fn verdict_prompt(question: &str, transcript: &str) -> String {
        format!(
            r#"Original question: {}

Complete trial transcript:
{}

Synthesize all perspectives into a final verdict that answers the original question. Reference personas by name."#,
            question, transcript
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_up_system_lists_names() {
        let personas = vec![
            Persona::with_id("a", "The VC", "", ""),
            Persona::with_id("b", "The Mom", "", ""),
        ];
        let prompt = JuryPromptTemplate::follow_up_system(&personas);
        assert!(prompt.contains("Available personas: The VC, The Mom"));
        assert!(prompt.contains("targetPersonaName"));
    }

    #[test]
    fn test_follow_up_prompt_includes_answers() {
        let prompt = JuryPromptTemplate::follow_up_prompt(
            "Should we launch?",
            &[("The VC".to_string(), "Only at scale.".to_string())],
        );
        assert!(prompt.contains("Original question: Should we launch?"));
        assert!(prompt.contains("- The VC: Only at scale."));
    }

    #[test]
    fn test_continue_prompt_shows_round() {
        let prompt = JuryPromptTemplate::continue_prompt("...", 2, 5);
        assert!(prompt.contains("Current round: 2/5"));
    }
}
