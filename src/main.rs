//! Auto Claude - non-interactive Claude Code runs with a readable transcript.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use auto_claude::config::{validate_claude_options, ConfigError, ConfigLoader, OptionsError, Settings};
use auto_claude::display::Recorder;
use auto_claude::error::RunError;
use auto_claude::format::{default_diagnostic_path, DiagnosticSink, TranscriptFormatter};
use auto_claude::runner::{RunConfig, RunController};

#[derive(Parser)]
#[command(
    name = "auto-claude",
    about = "Run Claude Code non-interactively with a readable transcript",
    version
)]
struct Cli {
    /// The prompt. Read from standard input when omitted.
    prompt: Option<String>,

    /// Working directory for Claude.
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// Mirror the transcript and final usage record to this file.
    #[arg(short = 'l', long)]
    log: Option<PathBuf>,

    /// Retry failed runs, resuming the session when possible.
    #[arg(short = 'r', long)]
    retry: bool,

    /// Show tool results in the transcript.
    #[arg(short = 't', long)]
    tool_results: bool,

    /// Configuration file to use instead of the default search.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Options passed through to claude, after `--`.
    #[arg(last = true, allow_hyphen_values = true)]
    claude_options: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("Failed to read prompt from stdin: {0}")]
    Stdin(#[from] std::io::Error),
    #[error("No prompt provided")]
    EmptyPrompt,
    #[error(transparent)]
    Run(#[from] RunError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings, ConfigError> {
    let loader = match path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    loader.load()
}

async fn read_prompt(prompt: Option<String>) -> Result<String, AppError> {
    let prompt = match prompt {
        Some(prompt) => prompt,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    if prompt.trim().is_empty() {
        return Err(AppError::EmptyPrompt);
    }
    Ok(prompt)
}

async fn run(cli: Cli) -> Result<String, AppError> {
    let settings = load_settings(cli.config)?;
    validate_claude_options(&cli.claude_options)?;
    let prompt = read_prompt(cli.prompt).await?;

    let mut recorder = Recorder::stderr().with_color(std::io::stderr().is_terminal());
    if let Some(path) = &cli.log {
        recorder.open_log(path);
    }

    let mut formatter =
        TranscriptFormatter::new().with_tool_results(settings.show_tool_results || cli.tool_results);
    if let Some(path) = settings.unhandled_log.clone().or_else(default_diagnostic_path) {
        let sink = DiagnosticSink::new(path);
        tracing::debug!(path = %sink.path().display(), "Recording unhandled tool calls");
        formatter = formatter.with_diagnostics(sink);
    }

    let config = RunConfig::from_settings(&settings)
        .options(cli.claude_options)
        .directory(cli.directory)
        .retry(cli.retry);
    let mut controller = RunController::new(config, recorder, formatter);

    let config = controller.config();
    tracing::info!(
        binary = %config.claude_binary,
        retry = config.retry,
        max_attempts = config.effective_max_attempts(),
        "Starting auto-claude"
    );
    Ok(controller.run(&prompt).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("  Error: {e}");
            ExitCode::FAILURE
        }
    }
}
