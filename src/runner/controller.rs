//! Attempt/retry loop for one logical run.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::ClaudeProcessBuilder;
use crate::config::Settings;
use crate::display::Recorder;
use crate::error::RunError;
use crate::format::TranscriptFormatter;
use crate::runner::{AttemptOutcome, EventStreamProcessor, Limits, RetryState};

/// Everything a run needs besides the prompt.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub claude_binary: String,
    /// Options passed through to Claude Code, already validated.
    pub options: Vec<String>,
    pub directory: Option<PathBuf>,
    pub retry: bool,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub limits: Limits,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RunConfig {
    /// Build a run configuration from loaded settings. Retrying is off.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            claude_binary: settings.claude_binary.clone(),
            options: Vec::new(),
            directory: None,
            retry: false,
            max_attempts: settings.max_attempts,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            limits: Limits {
                prompt_max_lines: settings.prompt_max_lines,
                message_max_lines: settings.message_max_lines,
            },
        }
    }

    #[must_use]
    pub fn options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Attempts allowed for this run.
    #[must_use]
    pub fn effective_max_attempts(&self) -> u32 {
        if self.retry {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    fn builder(&self, options: Vec<String>) -> ClaudeProcessBuilder {
        let builder = ClaudeProcessBuilder::new(self.claude_binary.as_str()).options(options);
        match &self.directory {
            Some(dir) => builder.working_dir(dir),
            None => builder,
        }
    }
}

/// Drives attempts until one succeeds or the run is given up.
pub struct RunController<W: Write> {
    config: RunConfig,
    recorder: Recorder<W>,
    formatter: TranscriptFormatter,
}

impl<W: Write> RunController<W> {
    #[must_use]
    pub fn new(config: RunConfig, recorder: Recorder<W>, formatter: TranscriptFormatter) -> Self {
        Self {
            config,
            recorder,
            formatter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    #[must_use]
    pub fn recorder(&self) -> &Recorder<W> {
        &self.recorder
    }

    pub fn into_recorder(self) -> Recorder<W> {
        self.recorder
    }

    /// Run `prompt` to completion.
    ///
    /// The metadata of the attempt that ended the run, if it captured any,
    /// is written to the log and the log is closed before this returns,
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once no further attempt is allowed.
    pub async fn run(&mut self, prompt: &str) -> Result<String, RunError> {
        let mut state = RetryState::new(self.config.effective_max_attempts());

        let (outcome, final_metadata) = loop {
            let attempt = state.begin_attempt();
            let (options, resumed) = state.options_for_attempt(&self.config.options);
            if resumed {
                if let Some(id) = state.last_session_id() {
                    self.recorder.notice(&format!(
                        "  Retrying with --resume {id} (attempt {attempt}/{})...",
                        state.max_attempts()
                    ));
                }
            }
            tracing::info!(attempt, max = state.max_attempts(), "Starting attempt");

            let builder = self.config.builder(options);
            let AttemptOutcome { result, metadata } = EventStreamProcessor::new(
                &mut self.recorder,
                &self.formatter,
                self.config.limits,
            )
            .run(&builder, prompt)
            .await;

            let captured = metadata.is_some();
            let session_id = metadata.as_ref().and_then(|m| m.session_id.clone());

            match result {
                Ok(output) => {
                    state.succeed();
                    break (Ok(output), metadata);
                }
                Err(error) => {
                    state.record_failure(session_id, &error);
                    if !state.should_retry(&error, captured) {
                        tracing::warn!(attempt, error = %error, "Giving up");
                        state.fail();
                        break (Err(error), metadata);
                    }
                    tracing::warn!(attempt, error = %error, "Attempt failed, retrying");
                    self.recorder.notice(&format!("  Error occurred: {error}"));
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        };

        if let Some(metadata) = &final_metadata {
            self.recorder.write_metadata(metadata);
        }
        self.recorder.close();
        outcome
    }
}
