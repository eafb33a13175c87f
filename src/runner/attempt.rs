//! One attempt: a single Claude Code invocation and its event stream.
//!
//! Errors raised by the stream (an error result, a non-zero exit) are held
//! until the transcript and usage stats of the attempt are complete, then
//! handed back to the caller together with whatever metadata was captured.

use std::io::Write;
use std::path::Path;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::cli::{ClaudeEvent, ClaudeProcess, ClaudeProcessBuilder, ResultEvent, StreamParser};
use crate::display::{Color, Recorder};
use crate::error::RunError;
use crate::format::TranscriptFormatter;
use crate::runner::ResultMetadata;

/// Line limits applied to an attempt's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Lines of the prompt echoed before the transcript.
    pub prompt_max_lines: usize,
    /// Lines shown per transcript message.
    pub message_max_lines: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            prompt_max_lines: crate::display::DEFAULT_MAX_LINES,
            message_max_lines: crate::display::DEFAULT_MAX_LINES,
        }
    }
}

/// What an attempt hands back to the run controller.
#[derive(Debug)]
pub struct AttemptOutcome {
    /// Accumulated result text, or the attempt's error.
    pub result: Result<String, RunError>,
    /// Metadata captured during the attempt, possibly minimal.
    pub metadata: Option<ResultMetadata>,
}

/// Consumes one Claude Code event stream.
pub struct EventStreamProcessor<'a, W: Write> {
    recorder: &'a mut Recorder<W>,
    formatter: &'a TranscriptFormatter,
    limits: Limits,
    output: String,
    metadata: Option<ResultMetadata>,
    error: Option<RunError>,
}

impl<'a, W: Write> EventStreamProcessor<'a, W> {
    #[must_use]
    pub fn new(
        recorder: &'a mut Recorder<W>,
        formatter: &'a TranscriptFormatter,
        limits: Limits,
    ) -> Self {
        Self {
            recorder,
            formatter,
            limits,
            output: String::new(),
            metadata: None,
            error: None,
        }
    }

    /// Run one attempt: spawn, feed the prompt, render the stream.
    pub async fn run(mut self, builder: &ClaudeProcessBuilder, prompt: &str) -> AttemptOutcome {
        self.recorder.print_message("---", Color::Cyan, 1);

        if let Some(dir) = builder.get_working_dir() {
            if !dir.is_dir() {
                return self.finish_with(RunError::Configuration(format!(
                    "Directory does not exist: {}",
                    dir.display()
                )));
            }
            self.recorder.print_message(
                &format!("Working directory: {}", dir.display()),
                Color::DarkGray,
                1,
            );
        }
        if let Some(path) = self.recorder.log_path().map(Path::to_path_buf) {
            self.recorder.print_message(
                &format!("Log file: {}", path.display()),
                Color::DarkGray,
                1,
            );
        }
        self.recorder
            .print_message(prompt, Color::Blue, self.limits.prompt_max_lines);

        if let Err(e) = self.stream(builder, prompt).await {
            tracing::warn!(error = %e, "Attempt aborted");
            if let Some(metadata) = self.metadata.as_mut() {
                metadata.mark_failed(e.to_string());
            }
            self.error = Some(e);
        }

        if let Some(metadata) = self.metadata.clone() {
            for line in metadata.stat_lines() {
                self.recorder.print_stat(&line);
            }
        }
        self.recorder.print_message("---", Color::Cyan, 1);

        self.into_outcome()
    }

    async fn stream(&mut self, builder: &ClaudeProcessBuilder, prompt: &str) -> Result<(), RunError> {
        let mut process = ClaudeProcess::spawn(builder)?;
        tracing::info!(pid = ?process.id(), "Claude process started");

        let stdin = process.take_stdin();
        let payload = prompt.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let stderr = process.take_stderr();
        let stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let mut read_error = None;
        if let Some(stdout) = process.take_stdout() {
            let mut events = std::pin::pin!(StreamParser::events(stdout));
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => self.handle_event(event),
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }
        }

        match writer.await {
            Ok(Err(e)) => tracing::debug!(error = %e, "Failed to write prompt to claude"),
            Err(e) => tracing::debug!(error = %e, "Prompt writer task failed"),
            Ok(Ok(())) => {}
        }

        let status = process.wait().await.map_err(crate::cli::SpawnError::Io)?;
        let stderr = stderr_reader.await.unwrap_or_default();
        tracing::info!(status = %status, "Claude process exited");

        if !status.success() {
            self.record_exit_failure(status.code().unwrap_or(-1), stderr);
        } else if let Some(e) = read_error {
            return Err(e.into());
        }
        Ok(())
    }

    /// Route one event.
    pub fn handle_event(&mut self, event: ClaudeEvent) {
        tracing::trace!(kind = event.kind(), "Claude event");
        match event {
            ClaudeEvent::Assistant(message) | ClaudeEvent::User(message) => {
                for formatted in self.formatter.format_blocks(&message.content) {
                    self.recorder.print_message(
                        &formatted.text,
                        formatted.kind.color(),
                        self.limits.message_max_lines,
                    );
                }
            }
            ClaudeEvent::Result(result) => {
                if let Some(text) = self.handle_result(&result) {
                    self.output.push_str(&text);
                }
            }
            ClaudeEvent::System => {}
            ClaudeEvent::Unknown { kind } => {
                tracing::warn!(kind = %kind, "Unexpected message type");
                self.recorder
                    .notice(&format!("Warning: Unexpected message type: {kind}"));
            }
        }
    }

    /// Settle the attempt from its result event.
    ///
    /// Returns the result text on success. Failures are recorded, not raised.
    /// Only the first result event of an attempt is honored.
    pub fn handle_result(&mut self, result: &ResultEvent) -> Option<String> {
        if self.metadata.is_some() {
            tracing::warn!("Ignoring additional result event");
            return None;
        }

        if result.is_error {
            let message = result
                .result
                .as_deref()
                .filter(|text| !text.is_empty())
                .or_else(|| result.error_message())
                .unwrap_or("Unknown error")
                .to_string();
            self.metadata = Some(ResultMetadata::from_event(
                result,
                false,
                Some(message.clone()),
            ));
            self.error = Some(RunError::Reported(message));
            None
        } else if result.is_success() {
            self.metadata = Some(ResultMetadata::from_event(result, true, None));
            Some(result.result.clone().unwrap_or_default())
        } else {
            let error = RunError::Incomplete(result.to_json());
            self.metadata = Some(ResultMetadata::from_event(
                result,
                false,
                Some(error.to_string()),
            ));
            self.error = Some(error);
            None
        }
    }

    /// A non-zero exit overrides any success reported by the stream.
    fn record_exit_failure(&mut self, code: i32, stderr: String) {
        let error = RunError::SubprocessExit { code, stderr };
        let message = error.to_string();
        tracing::warn!(code, "Claude exited with failure");
        self.metadata
            .get_or_insert_with(|| ResultMetadata::failed(message.clone()))
            .mark_failed(message);
        self.error = Some(error);
    }

    fn finish_with(mut self, error: RunError) -> AttemptOutcome {
        self.error = Some(error);
        self.into_outcome()
    }

    /// Metadata captured so far.
    #[must_use]
    pub fn metadata(&self) -> Option<&ResultMetadata> {
        self.metadata.as_ref()
    }

    /// Close the attempt.
    #[must_use]
    pub fn into_outcome(self) -> AttemptOutcome {
        let result = match self.error {
            Some(error) => Err(error),
            None => Ok(self.output),
        };
        AttemptOutcome {
            result,
            metadata: self.metadata,
        }
    }
}
