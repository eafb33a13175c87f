//! Transcript formatting for message content blocks.
//!
//! Every block maps to at most one display message. Formatting is pure; the
//! only side effect is the best-effort diagnostic record of tool calls that
//! have no dedicated rendering yet.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::cli::{ContentBlock, ToolResult, ToolUse};
use crate::display::Color;

/// Argument keys that only describe a tool call and are never rendered.
const COSMETIC_KEYS: [&str; 3] = ["description", "old_string", "new_string"];

/// Tools rendered inline as `name(args)`.
const INTERACTIVE_TOOLS: [&str; 10] = [
    "Bash",
    "Read",
    "Edit",
    "MultiEdit",
    "Write",
    "Glob",
    "Grep",
    "LS",
    "WebFetch",
    "WebSearch",
];

/// Marker for transcript text from the assistant.
const MESSAGE_MARKER: &str = "→";

/// Marker for tool results.
const RESULT_MARKER: &str = "←";

/// What a formatted message represents; drives its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Message,
    ToolUse,
    McpTool,
    ToolResult,
    ToolError,
    Other,
}

impl MessageKind {
    /// Display color for this kind.
    #[must_use]
    pub fn color(self) -> Color {
        match self {
            Self::ToolResult => Color::LightGray,
            Self::ToolError => Color::Red,
            Self::Message | Self::ToolUse | Self::McpTool | Self::Other => Color::White,
        }
    }
}

/// One rendered transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub text: String,
    pub kind: MessageKind,
}

impl FormattedMessage {
    fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Returns the default diagnostic file, `~/.claude/unhandled_message_types.txt`.
#[must_use]
pub fn default_diagnostic_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("unhandled_message_types.txt"))
}

/// Append-only record of tool invocations without a dedicated rendering.
#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    path: PathBuf,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one raw JSON line. Errors are logged and swallowed.
    pub fn record(&self, raw: &Value) {
        if let Err(e) = self.try_record(raw) {
            tracing::debug!(path = %self.path.display(), error = %e, "Could not record unhandled tool call");
        }
    }

    fn try_record(&self, raw: &Value) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{raw}")
    }
}

/// Converts content blocks into transcript text.
#[derive(Debug, Clone, Default)]
pub struct TranscriptFormatter {
    show_tool_results: bool,
    diagnostics: Option<DiagnosticSink>,
}

impl TranscriptFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render tool results instead of suppressing them.
    #[must_use]
    pub fn with_tool_results(mut self, show: bool) -> Self {
        self.show_tool_results = show;
        self
    }

    /// Record unhandled tool calls to `sink`.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Format every block, dropping the ones that render to nothing.
    #[must_use]
    pub fn format_blocks(&self, blocks: &[ContentBlock]) -> Vec<FormattedMessage> {
        blocks
            .iter()
            .filter_map(|block| self.format_block(block))
            .collect()
    }

    /// Format one block.
    #[must_use]
    pub fn format_block(&self, block: &ContentBlock) -> Option<FormattedMessage> {
        match block {
            ContentBlock::Text { text } => Some(FormattedMessage::new(
                format!("{MESSAGE_MARKER} {}", indent_text(text)),
                MessageKind::Message,
            )),
            ContentBlock::ToolUse(tool) => Some(self.format_tool_use(tool)),
            ContentBlock::ToolResult(result) => self
                .show_tool_results
                .then(|| format_tool_result(result)),
            ContentBlock::Other(value) => Some(FormattedMessage::new(
                dump_without_id(value),
                MessageKind::Other,
            )),
        }
    }

    fn format_tool_use(&self, tool: &ToolUse) -> FormattedMessage {
        let input = filter_input(&tool.input, &COSMETIC_KEYS);
        let name = tool.name.as_str();

        match name {
            "Task" => FormattedMessage::new(
                format!("{MESSAGE_MARKER} {name}{}", format_task_input(&input)),
                MessageKind::ToolUse,
            ),
            "TodoWrite" => FormattedMessage::new(
                format!("{MESSAGE_MARKER} {name}{}", format_todo_input(&input)),
                MessageKind::ToolUse,
            ),
            _ if INTERACTIVE_TOOLS.contains(&name) => FormattedMessage::new(
                format!("{MESSAGE_MARKER} {name}({})", format_arguments(&input)),
                MessageKind::ToolUse,
            ),
            _ => {
                if let Some(sink) = &self.diagnostics {
                    sink.record(&tool.to_value());
                }
                let args = serde_json::to_string_pretty(&Value::Object(input))
                    .unwrap_or_default();
                let kind = if tool.is_mcp() {
                    MessageKind::McpTool
                } else {
                    MessageKind::ToolUse
                };
                FormattedMessage::new(
                    format!(
                        "{MESSAGE_MARKER} {} {}",
                        tool_display_name(name),
                        indent_text(&args)
                    ),
                    kind,
                )
            }
        }
    }
}

/// Render an argument map: nothing, a bare value, or `key: value` pairs.
#[must_use]
pub fn format_arguments(args: &Map<String, Value>) -> String {
    match args.len() {
        0 => String::new(),
        1 => args.values().next().map(Value::to_string).unwrap_or_default(),
        _ => args
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Copy of `input` without `excluded` keys, order preserved.
#[must_use]
pub fn filter_input(input: &Map<String, Value>, excluded: &[&str]) -> Map<String, Value> {
    input
        .iter()
        .filter(|(key, _)| !excluded.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Render one todo entry as `id. [marker] content`.
#[must_use]
pub fn format_todo_item(item: &Value) -> String {
    let marker = match item.get("status").and_then(Value::as_str) {
        Some("pending") => "[ ]",
        Some("in_progress") => "[-]",
        Some("completed") => "[x]",
        _ => "[?]",
    };
    format!(
        "{}. {marker} {}",
        scalar_text(item.get("id")),
        scalar_text(item.get("content"))
    )
}

/// Display name of a tool; `mcp__gitlab__search_repositories` becomes
/// `[gitlab] Search Repositories`.
#[must_use]
pub fn tool_display_name(name: &str) -> String {
    let parts: Vec<&str> = name.split("__").collect();
    if parts.len() < 3 || parts[0] != "mcp" {
        return name.to_string();
    }
    let action = parts[2..]
        .join("_")
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{}] {action}", parts[1])
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn format_task_input(input: &Map<String, Value>) -> String {
    let Some(prompt) = input.get("prompt").and_then(Value::as_str) else {
        return format!("({})", format_arguments(input));
    };
    let prompt_lines = prompt
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("\t{line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let args = format_arguments(&filter_input(input, &["prompt"]));
    format!("({args})\n{prompt_lines}")
}

fn format_todo_input(input: &Map<String, Value>) -> String {
    let todos = input
        .get("todos")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let todo_text = todos
        .iter()
        .map(|item| format!("\t{}", format_todo_item(item)))
        .collect::<Vec<_>>()
        .join("\n");
    let args = format_arguments(&filter_input(input, &["todos"]));
    format!("({args})\n{todo_text}")
}

fn format_tool_result(result: &ToolResult) -> FormattedMessage {
    let (body, looks_failed) = match &result.content {
        Value::Null => (String::new(), false),
        Value::String(text) => {
            // Substring match only; a successful result can mention "error".
            let looks_failed = text.contains("MCP error")
                || text.contains("Error:")
                || text.contains("error");
            let has_json = text
                .lines()
                .any(|line| matches!(line.trim(), "{" | "["));
            let body = if has_json {
                dedent_text(text)
            } else {
                indent_text(text)
            };
            (body, looks_failed)
        }
        Value::Array(items) => {
            let body = items
                .iter()
                .map(|item| match item.get("text").and_then(Value::as_str) {
                    Some(text) if item.get("type").and_then(Value::as_str) == Some("text") => {
                        let trimmed = text.trim_start();
                        if trimmed.starts_with('{') || trimmed.starts_with('[') {
                            dedent_text(text)
                        } else {
                            indent_text(text)
                        }
                    }
                    _ => indent_text(&serde_json::to_string_pretty(item).unwrap_or_default()),
                })
                .collect::<Vec<_>>()
                .join("\n");
            (body, false)
        }
        other => (
            indent_text(&serde_json::to_string_pretty(other).unwrap_or_default()),
            false,
        ),
    };

    if body.trim().is_empty() {
        return FormattedMessage::new(
            format!("{RESULT_MARKER} Tool result (empty)"),
            MessageKind::ToolResult,
        );
    }

    let kind = if result.is_error || looks_failed {
        MessageKind::ToolError
    } else {
        MessageKind::ToolResult
    };
    FormattedMessage::new(format!("{RESULT_MARKER} Tool result:\n{body}"), kind)
}

/// Tab-indent every line, then drop the leading whitespace of the whole text
/// so the first line follows its marker directly.
fn indent_text(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| format!("\t{line}"))
        .collect::<String>()
        .trim_start()
        .to_string()
}

/// Replace the common leading indentation of pre-formatted text with one tab.
fn dedent_text(text: &str) -> String {
    let min_indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("\t{}", line.get(min_indent..).unwrap_or(line.trim_start()))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn dump_without_id(value: &Value) -> String {
    let dumped = match value {
        Value::Object(map) => Value::Object(filter_input(map, &["id"])),
        other => other.clone(),
    };
    serde_json::to_string_pretty(&dumped).unwrap_or_default()
}
