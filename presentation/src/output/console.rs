//! Console output formatter for trials

use colored::{ColoredString, Colorize};
use jury_domain::core::string::truncate;
use jury_domain::{
    AgentResult, InteractionType, OutputFormat, Persona, SYSTEM_SPEAKER, Trial, TrialInteraction,
    TrialStatus, speaker_label,
};

/// Formats trials for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Force colors off (or back to terminal detection) for all output
    pub fn set_color(enabled: bool) {
        if enabled {
            colored::control::unset_override();
        } else {
            colored::control::set_override(false);
        }
    }

    /// Render a trial in the requested format
    pub fn render(trial: &Trial, format: OutputFormat) -> String {
        match format {
            OutputFormat::Transcript => Self::format_transcript(trial),
            OutputFormat::Verdict => Self::format_verdict(trial),
            OutputFormat::Json => Self::format_json(trial),
        }
    }

    /// Full transcript grouped by round
    pub fn format_transcript(trial: &Trial) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Trial Transcript"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Question:".cyan().bold(),
            trial.original_question
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Jury:".cyan().bold(),
            Self::jury_names(&trial.personas)
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::status_label(trial.status)
        ));

        let mut round = 0;
        for interaction in &trial.interactions {
            if interaction.round_number != round {
                round = interaction.round_number;
                output.push_str(&Self::section_header(&format!("Round {}", round)));
            }
            output.push('\n');
            output.push_str(&Self::format_interaction(interaction, &trial.personas));
            output.push('\n');
        }

        output.push_str(&Self::footer());
        output
    }

    /// Verdict only (concise output)
    pub fn format_verdict(trial: &Trial) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n\n", "=== The Jury's Verdict ===".cyan().bold()));
        output.push_str(&format!("{} {}\n\n", "Q:".bold(), trial.original_question));
        output.push_str(&format!(
            "{} {}\n\n",
            "Jury:".dimmed(),
            Self::jury_names(&trial.personas)
        ));

        match (&trial.verdict, trial.status) {
            (Some(verdict), _) => output.push_str(verdict),
            (None, TrialStatus::Failed) => {
                let reason = trial
                    .interactions
                    .iter()
                    .rev()
                    .find(|i| i.speaker == SYSTEM_SPEAKER)
                    .map(|i| i.content.as_str())
                    .unwrap_or("Trial failed");
                output.push_str(&reason.red().to_string());
            }
            (None, status) => output.push_str(&format!(
                "{} ({})",
                "No verdict yet".yellow(),
                status.display_name()
            )),
        }
        output.push('\n');

        output
    }

    /// Format as JSON
    pub fn format_json(trial: &Trial) -> String {
        serde_json::to_string_pretty(trial).unwrap_or_else(|_| "{}".to_string())
    }

    /// One interaction: a colored heading line followed by the content
    pub fn format_interaction(interaction: &TrialInteraction, personas: &[Persona]) -> String {
        let speaker = speaker_label(&interaction.speaker, personas);
        let heading = match (&interaction.interaction_type, &interaction.target_persona) {
            (InteractionType::FollowUpQuestion, Some(target)) => {
                format!("── {} -> {} ──", speaker, speaker_label(target, personas))
            }
            (InteractionType::Verdict, _) if interaction.speaker == SYSTEM_SPEAKER => {
                format!("── {} ──", speaker)
            }
            (InteractionType::Verdict, _) => "── Verdict ──".to_string(),
            _ => format!("── {} ──", speaker),
        };

        let heading = match interaction.interaction_type {
            InteractionType::Verdict if interaction.speaker == SYSTEM_SPEAKER => {
                heading.red().bold()
            }
            InteractionType::Verdict => heading.green().bold(),
            InteractionType::InitialQuestion | InteractionType::FollowUpQuestion => {
                heading.cyan().bold()
            }
            _ => heading.yellow().bold(),
        };

        format!("{}\n{}", heading, interaction.content)
    }

    /// Render the answers of a summoned jury
    pub fn render_summons(
        question: &str,
        results: &[AgentResult],
        personas: &[Persona],
        format: OutputFormat,
    ) -> String {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Transcript | OutputFormat::Verdict => {
                let mut output = String::new();
                output.push_str(&format!("{} {}\n", "Question:".cyan().bold(), question));
                for result in results {
                    output.push('\n');
                    output.push_str(&Self::format_agent_result(result, personas));
                    output.push('\n');
                }
                output
            }
        }
    }

    /// One persona's answer card
    pub fn format_agent_result(result: &AgentResult, personas: &[Persona]) -> String {
        let heading = format!("── {} ──", speaker_label(&result.persona_id, personas))
            .yellow()
            .bold();
        let body = match &result.error {
            _ if result.is_loading => "Thinking...".dimmed().to_string(),
            Some(error) => format!("Error: {}", error).red().to_string(),
            None => result.response.clone(),
        };
        format!("{}\n{}", heading, body)
    }

    /// One line per stored trial, newest first
    pub fn format_trial_list(trials: &[Trial]) -> String {
        if trials.is_empty() {
            return format!("{}\n", "No trials yet.".dimmed());
        }

        let mut output = String::new();
        for trial in trials {
            output.push_str(&format!(
                "{}  {}  {:<28}  {}\n",
                trial.id.dimmed(),
                trial.created_at.format("%Y-%m-%d %H:%M"),
                Self::status_label(trial.status),
                truncate(&trial.original_question, 60)
            ));
        }
        output
    }

    /// Configured personas with descriptions
    pub fn format_personas(personas: &[Persona]) -> String {
        let mut output = String::new();
        for persona in personas {
            output.push_str(&format!(
                "{} {}\n",
                persona.name.bold(),
                format!("({})", persona.id).dimmed()
            ));
            if !persona.description.is_empty() {
                output.push_str(&Self::indent(&persona.description, "  "));
                output.push('\n');
            }
        }
        output
    }

    fn status_label(status: TrialStatus) -> ColoredString {
        match status {
            TrialStatus::Completed => status.display_name().green(),
            TrialStatus::Failed => status.display_name().red(),
            _ => status.display_name().yellow(),
        }
    }

    fn jury_names(personas: &[Persona]) -> String {
        personas
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
