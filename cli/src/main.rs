//! CLI entrypoint for the-jury
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use jury_application::{
    ConversationLogger, LlmGateway, NoConversationLogger, SummonJury, TrialOrchestrator,
    TrialRepository, TrialStore,
};
use jury_domain::{OutputFormat, Persona, Question, TrialStatus};
use jury_infrastructure::{
    ConfigLoader, FileConfig, GeminiConfig, GeminiGateway, InMemoryTrialRepository,
    JsonlConversationLogger, SqliteTrialRepository,
};
use jury_presentation::{
    Cli, ConsoleFormatter, NoProgress, ProgressReporter, SimpleProgress, SummonProgress,
    TrialProgress, follow_summons, follow_trial,
};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    // Held for the whole run so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, config.logging.log_dir.as_deref());

    config.validate().context("Invalid configuration")?;
    ConsoleFormatter::set_color(config.output.color);

    info!("Starting the-jury");

    if cli.personas {
        print!("{}", ConsoleFormatter::format_personas(&config.roster().snapshot()));
        return Ok(());
    }

    // === Dependency Injection ===
    let database = if cli.ephemeral {
        None
    } else {
        config.storage.database_path()
    };
    match database {
        Some(path) => {
            let repository = SqliteTrialRepository::open(&path)
                .await
                .with_context(|| format!("Failed to open trial database {}", path.display()))?;
            run(&cli, &config, Arc::new(repository)).await
        }
        None => run(&cli, &config, Arc::new(InMemoryTrialRepository::new())).await,
    }
}

/// Initialize logging based on verbosity level, plus an optional daily log file
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "the-jury.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    guard
}

async fn run<R: TrialRepository + 'static>(
    cli: &Cli,
    config: &FileConfig,
    repository: Arc<R>,
) -> Result<()> {
    let logger: Arc<dyn ConversationLogger> = match config
        .logging
        .transcript_dir
        .as_deref()
        .and_then(JsonlConversationLogger::in_dir)
    {
        Some(logger) => Arc::new(logger),
        None => Arc::new(NoConversationLogger),
    };
    let store = Arc::new(TrialStore::new(repository).with_logger(logger));

    let format = cli
        .output
        .map(Into::into)
        .or(config.output.format)
        .unwrap_or_default();

    if cli.list {
        let trials = store.get_all().await;
        if let Some(error) = store.last_error() {
            bail!("Failed to load trials: {}", error);
        }
        print!("{}", ConsoleFormatter::format_trial_list(&trials));
        return Ok(());
    }

    if let Some(id) = &cli.show {
        let Some(trial) = store.get_trial(id).await else {
            bail!("Trial not found: {}", id);
        };
        println!("{}", ConsoleFormatter::render(&trial, format));
        return Ok(());
    }

    let Some(question) = cli.question.as_deref() else {
        bail!("A question is required. Try: the-jury \"Should I learn Rust?\"");
    };
    let question = Question::parse(question)?;

    let roster = config.roster();
    let personas = if cli.persona.is_empty() {
        roster.snapshot()
    } else {
        roster.select(&cli.persona)?
    };

    let api_key = config.model.api_key().with_context(|| {
        format!(
            "No API key found. Set {} to your Gemini API key.",
            config.model.api_key_env
        )
    })?;
    let gateway = Arc::new(GeminiGateway::new(
        GeminiConfig::new(api_key)
            .with_base_url(config.model.base_url.clone())
            .with_model(config.model.model.clone())
            .with_request_timeout(config.model.request_timeout()),
    )?);
    info!("Using model {}", gateway.model());

    if cli.quick {
        return summon(cli, config, gateway, &question, &personas, format).await;
    }

    let orchestrator = Arc::new(TrialOrchestrator::new(
        gateway,
        Arc::clone(&store),
        config.trial_params(),
    ));
    orchestrator.initialize().await;

    let snapshots = orchestrator.conduct_trial(question, personas);

    // Ctrl-C stops the trial; it is recorded as FAILED
    let stopper = Arc::clone(&orchestrator);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            for id in stopper.active_trials() {
                if let Err(e) = stopper.stop_trial(&id).await {
                    warn!("Failed to stop trial {}: {}", id, e);
                }
            }
        }
    });

    let progress: Box<dyn TrialProgress> = if cli.quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress::new())
    };

    let last = follow_trial(snapshots, progress.as_ref()).await;
    interrupt.abort();

    let Some(state) = last else {
        let reason = orchestrator
            .last_error()
            .borrow()
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("The trial could not be started: {}", reason);
    };

    println!("{}", ConsoleFormatter::render(&state.trial, format));

    if state.trial.status == TrialStatus::Failed {
        bail!("Trial {} ended without a verdict", state.trial.id);
    }
    Ok(())
}

/// `--quick`: every persona answers once, nothing is stored
async fn summon<G: LlmGateway + 'static>(
    cli: &Cli,
    config: &FileConfig,
    gateway: Arc<G>,
    question: &Question,
    personas: &[Persona],
    format: OutputFormat,
) -> Result<()> {
    let jury = SummonJury::new(gateway, config.trial_params());
    let cancel = CancellationToken::new();
    let updates = jury.summon(question, personas, &cancel);

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let progress: Box<dyn SummonProgress> = if cli.quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress::new())
    };

    let results = follow_summons(updates, personas, progress.as_ref()).await;
    interrupt.abort();

    println!(
        "{}",
        ConsoleFormatter::render_summons(question.content(), &results, personas, format)
    );

    if !results.iter().any(|r| r.is_usable()) {
        bail!("No persona answered");
    }
    Ok(())
}
