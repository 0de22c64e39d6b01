//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for a finished trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every interaction, round by round
    Transcript,
    /// Only the verdict
    Verdict,
    /// The whole trial as JSON
    Json,
}

impl From<OutputFormat> for jury_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Transcript => jury_domain::OutputFormat::Transcript,
            OutputFormat::Verdict => jury_domain::OutputFormat::Verdict,
            OutputFormat::Json => jury_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for the-jury
#[derive(Parser, Debug)]
#[command(name = "the-jury")]
#[command(author, version, about = "A moderated jury of LLM personas deliberates your question")]
#[command(long_about = r#"
The Jury puts your question to a panel of personas and a moderator.

A trial runs in up to five rounds:
1. Every persona answers the question in parallel
2. The moderator asks targeted follow-up questions while it sees value
3. The moderator weighs the whole transcript and writes a verdict

With --quick the jury is only summoned: every persona answers once, side by
side, with no moderator and nothing stored.

Configuration files are loaded from (in priority order):
1. JURY_* environment variables (e.g. JURY_TRIAL__MAX_ROUNDS=3)
2. --config <path>     Explicit config file
3. ./jury.toml         Project-level config
4. ~/.config/the-jury/config.toml   Global config

Example:
  the-jury "Should I quit my job to start a bakery?"
  the-jury -p "The VC" -p "The Mom" -o verdict "Is remote work here to stay?"
  the-jury --quick "Is a bakery a good side business?"
  the-jury --list
"#)]
pub struct Cli {
    /// The question to put to the jury
    pub question: Option<String>,

    /// Personas to seat on the jury, by name (can be specified multiple times)
    #[arg(short, long, value_name = "NAME")]
    pub persona: Vec<String>,

    /// Output format (defaults to the configured one, else transcript)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Summon the jury: one parallel answer per persona, no moderator, no trial
    #[arg(long, conflicts_with_all = ["list", "show"])]
    pub quick: bool,

    /// List past trials and exit
    #[arg(long, conflicts_with = "show")]
    pub list: bool,

    /// Print a stored trial and exit
    #[arg(long, value_name = "ID")]
    pub show: Option<String>,

    /// List configured personas and exit
    #[arg(long)]
    pub personas: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Keep trials in memory only; nothing is written to the database
    #[arg(long)]
    pub ephemeral: bool,
}
