//! Colored transcript output with an optional plain-text log mirror.
//!
//! The [`Recorder`] is created once per run and passed by `&mut` to every
//! attempt. It writes to the terminal (stderr in the binary) and, when a log
//! file is open, mirrors every line there with ANSI codes stripped.

use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use owo_colors::{OwoColorize, Style};
use regex::Regex;

use crate::runner::ResultMetadata;

/// Default number of lines shown per message.
pub const DEFAULT_MAX_LINES: usize = 5;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ANSI escape pattern"));

/// Remove ANSI color sequences from a line.
#[must_use]
pub fn strip_ansi(line: &str) -> String {
    ANSI_ESCAPE.replace_all(line, "").into_owned()
}

/// Color category of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue,
    Cyan,
    LightGray,
    DarkGray,
    Red,
    White,
}

impl Color {
    /// Terminal style for this color, emphasized or not.
    #[must_use]
    pub fn style(self, bold: bool) -> Style {
        let style = match self {
            Self::Blue => Style::new().bright_blue(),
            Self::Cyan => Style::new().bright_cyan(),
            Self::LightGray => Style::new().white(),
            Self::DarkGray => Style::new().bright_black(),
            Self::Red => Style::new().red(),
            Self::White => Style::new().bright_white(),
        };
        if bold {
            style.bold()
        } else {
            style
        }
    }
}

/// Log file handle. Closed when dropped.
#[derive(Debug)]
struct LogSink {
    path: PathBuf,
    writer: LineWriter<File>,
}

/// Transcript printer for one run.
#[derive(Debug)]
pub struct Recorder<W: Write = io::Stderr> {
    terminal: W,
    log: Option<LogSink>,
    color: bool,
}

impl Recorder<io::Stderr> {
    /// Recorder printing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Recorder<W> {
    /// Create a recorder writing to `terminal`, without colors or log file.
    #[must_use]
    pub fn new(terminal: W) -> Self {
        Self {
            terminal,
            log: None,
            color: false,
        }
    }

    /// Enable or disable ANSI colors on the terminal.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Open (truncating) the log file. Failure is reported, never fatal.
    pub fn open_log(&mut self, path: &Path) -> bool {
        match File::create(path) {
            Ok(file) => {
                tracing::debug!(path = %path.display(), "Opened log file");
                self.log = Some(LogSink {
                    path: path.to_path_buf(),
                    writer: LineWriter::new(file),
                });
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open log file");
                self.notice(&format!(
                    "Warning: Failed to open log file '{}': {e}",
                    path.display()
                ));
                false
            }
        }
    }

    /// Path of the open log file, if any.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|sink| sink.path.as_path())
    }

    /// Print a message, first line emphasized, at most `max_lines` lines.
    pub fn print_message(&mut self, message: &str, color: Color, max_lines: usize) {
        let lines: Vec<&str> = message.lines().collect();
        let Some((first, rest)) = lines.split_first() else {
            return;
        };
        let max_lines = max_lines.max(1);

        self.emit_line(&format!("  {first}"), "  ", first, color.style(true));
        for line in rest.iter().take(max_lines - 1) {
            self.emit_line(&format!("  {line}"), "  ", line, color.style(false));
        }

        if lines.len() > max_lines {
            let hidden = lines.len() - max_lines;
            let notice = format!(
                "+ {hidden} line{} not shown",
                if hidden == 1 { "" } else { "s" }
            );
            self.emit_line(
                &format!("    {notice}"),
                "    ",
                &notice,
                Color::LightGray.style(false),
            );
        }
    }

    /// Print one dimmed usage line.
    pub fn print_stat(&mut self, message: &str) {
        self.emit_line(
            &format!("  {message}"),
            "  ",
            message,
            Color::DarkGray.style(false),
        );
    }

    /// Print a status line on the terminal only.
    pub fn notice(&mut self, message: &str) {
        let _ = writeln!(self.terminal, "{message}");
        let _ = self.terminal.flush();
    }

    /// Append the run's metadata record as a single JSON line to the log.
    pub fn write_metadata(&mut self, metadata: &ResultMetadata) {
        if self.log.is_none() {
            return;
        }
        match serde_json::to_string(&metadata.to_record()) {
            Ok(json) => self.log_line(&json),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metadata record"),
        }
    }

    /// Flush and close the log file.
    pub fn close(&mut self) {
        if let Some(mut sink) = self.log.take() {
            if let Err(e) = sink.writer.flush() {
                tracing::warn!(path = %sink.path.display(), error = %e, "Failed to flush log file");
            }
        }
    }

    /// Consume the recorder, returning the terminal writer.
    pub fn into_terminal(mut self) -> W {
        self.close();
        self.terminal
    }

    fn emit_line(&mut self, plain: &str, indent: &str, body: &str, style: Style) {
        if self.color {
            let _ = writeln!(self.terminal, "{indent}{}", body.style(style));
        } else {
            let _ = writeln!(self.terminal, "{plain}");
        }
        let _ = self.terminal.flush();
        self.log_line(plain);
    }

    fn log_line(&mut self, line: &str) {
        let Some(sink) = self.log.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(sink.writer, "{}", strip_ansi(line)) {
            let message = format!("Warning: Failed to write to log file: {e}");
            tracing::warn!(path = %sink.path.display(), error = %e, "Log write failed");
            self.notice(&message);
        }
    }
}
