//! Event types from Claude Code stream-json output.
//!
//! Claude Code emits one JSON object per line when running with
//! `--output-format stream-json --verbose`. Only a handful of event kinds
//! matter for rendering a transcript; everything else is kept as an opaque
//! value so that new kinds never break decoding.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUse {
    /// Identifier of this tool use, when present.
    pub id: Option<String>,
    /// Name of the tool being invoked.
    pub name: String,
    /// Tool arguments, in wire order.
    pub input: Map<String, Value>,
    /// The block as received, when decoded from the wire.
    pub raw: Option<Value>,
}

impl ToolUse {
    /// Wire representation of this block: the received block verbatim, or
    /// a rebuilt one for tool uses constructed in code.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut block = Map::new();
        block.insert("type".to_string(), Value::from("tool_use"));
        if let Some(id) = &self.id {
            block.insert("id".to_string(), Value::from(id.as_str()));
        }
        block.insert("name".to_string(), Value::from(self.name.as_str()));
        block.insert("input".to_string(), Value::Object(self.input.clone()));
        Value::Object(block)
    }

    /// Returns true for tools served by an MCP server (`mcp__server__action`).
    #[must_use]
    pub fn is_mcp(&self) -> bool {
        self.name.contains("__")
    }
}

/// Output of a tool execution, echoed back in a `user` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResult {
    /// Identifier of the originating tool use.
    pub tool_use_id: Option<String>,
    /// Free-form payload: a string, a list of content items, or an object.
    pub content: Value,
    /// Explicit error flag, when the CLI provides one.
    pub is_error: bool,
}

/// One element of an assistant or user message's `content` list.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text body.
        text: String,
    },
    /// A tool invocation.
    ToolUse(ToolUse),
    /// A tool result.
    ToolResult(ToolResult),
    /// Any other block, kept verbatim.
    Other(Value),
}

impl From<Value> for ContentBlock {
    fn from(value: Value) -> Self {
        let Value::Object(mut block) = value else {
            return Self::Other(value);
        };
        let kind = block.get("type").and_then(Value::as_str).map(str::to_owned);

        match kind.as_deref() {
            Some("tool_use") => {
                let raw = Value::Object(block.clone());
                Self::ToolUse(ToolUse {
                    id: take_string(&mut block, "id"),
                    name: take_string(&mut block, "name").unwrap_or_default(),
                    input: match block.remove("input") {
                        Some(Value::Object(input)) => input,
                        _ => Map::new(),
                    },
                    raw: Some(raw),
                })
            }
            Some("text") => Self::Text {
                text: take_string(&mut block, "text").unwrap_or_default(),
            },
            Some("tool_result") => Self::ToolResult(ToolResult {
                tool_use_id: take_string(&mut block, "tool_use_id"),
                is_error: block
                    .get("is_error")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                content: block.remove("content").unwrap_or(Value::Null),
            }),
            _ => Self::Other(Value::Object(block)),
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Body of an assistant or user event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    /// Content blocks, in emission order.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Token usage reported with a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "lenient::count")]
    pub input_tokens: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub output_tokens: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Final result event, terminal for one CLI invocation.
///
/// Every field is optional on the wire and decoded leniently: a value of an
/// unexpected type reads as absent. Unknown fields are preserved in `extra`
/// so the event can be echoed back verbatim in diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    /// Result subtype (`success`, `error_max_turns`, ...).
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtype: Option<String>,
    /// Whether the CLI flagged this run as failed.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_error: bool,
    /// Final answer text, or the error description when `is_error` is set.
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<String>,
    /// Error details (`{"message": ...}`), shape not guaranteed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Total cost in USD.
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_cost_usd: Option<f64>,
    /// Wall-clock duration in milliseconds.
    #[serde(
        default,
        deserialize_with = "lenient::millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<u64>,
    /// Number of conversation turns.
    #[serde(
        default,
        deserialize_with = "lenient::turns",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_turns: Option<u32>,
    /// Token usage.
    #[serde(
        default,
        deserialize_with = "lenient::usage",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage: Option<Usage>,
    /// Session identifier, usable with `--resume`.
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// The event as received, set only when typed decoding failed.
    #[serde(skip)]
    pub undecoded: Option<Value>,
}

impl ResultEvent {
    /// Decode a result event without ever rejecting it.
    ///
    /// An object that still fails typed decoding is kept in `undecoded`,
    /// with only its session id recovered. It reads as neither an error nor
    /// a success.
    #[must_use]
    pub fn decode(value: Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Result event did not match the expected shape");
                Self {
                    session_id: value
                        .get("session_id")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                    undecoded: Some(value),
                    ..Self::default()
                }
            }
        }
    }

    /// Returns the nested `error.message`, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
    }

    /// Returns true if the subtype marks a successful completion.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.subtype.as_deref() == Some("success")
    }

    /// Serialize the event back to a single JSON line.
    #[must_use]
    pub fn to_json(&self) -> String {
        if let Some(raw) = &self.undecoded {
            return raw.to_string();
        }
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Events emitted by Claude Code in stream-json format.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaudeEvent {
    /// Assistant message with text and tool invocations.
    Assistant(Message),
    /// User message, typically carrying tool results.
    User(Message),
    /// Final result of the run.
    Result(Box<ResultEvent>),
    /// System event (init, hooks, ...). Not rendered.
    System,
    /// Any other kind, kept by name for reporting.
    Unknown {
        /// The raw `type` tag, empty if absent.
        kind: String,
    },
}

impl ClaudeEvent {
    /// Decode an event from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if a known event kind has a malformed body.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        match kind.as_str() {
            "assistant" | "user" => {
                let message = match value.get("message") {
                    Some(message) => Message::deserialize(message)?,
                    None => Message::default(),
                };
                Ok(if kind == "assistant" {
                    Self::Assistant(message)
                } else {
                    Self::User(message)
                })
            }
            "result" => Ok(Self::Result(Box::new(ResultEvent::decode(value)))),
            "system" => Ok(Self::System),
            _ => Ok(Self::Unknown { kind }),
        }
    }

    /// Returns the event kind as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Assistant(_) => "assistant",
            Self::User(_) => "user",
            Self::Result(_) => "result",
            Self::System => "system",
            Self::Unknown { kind } => kind,
        }
    }
}

impl<'de> Deserialize<'de> for ClaudeEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(D::Error::custom("event is not a JSON object"));
        }
        Self::from_value(value).map_err(D::Error::custom)
    }
}

/// Field decoders that read values of an unexpected type as absent.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Usage;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn whole(value: &Value) -> Option<u64> {
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n.round() as u64)
        })
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(Value::deserialize(d)?.as_bool().unwrap_or(false))
    }

    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(d)?.as_f64())
    }

    pub fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(whole(&Value::deserialize(d)?))
    }

    pub fn turns<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(whole(&Value::deserialize(d)?).and_then(|n| u32::try_from(n).ok()))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(whole(&Value::deserialize(d)?).unwrap_or(0))
    }

    pub fn usage<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Usage>, D::Error> {
        Ok(serde_json::from_value(Value::deserialize(d)?).ok())
    }
}
