//! Usage summary captured from the result event of an attempt.

use serde::{Deserialize, Serialize};

use crate::cli::ResultEvent;

/// Outcome and usage of one attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMetadata {
    pub success: bool,
    pub error_message: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub num_turns: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub session_id: Option<String>,
}

impl ResultMetadata {
    /// Capture the usage fields of a result event.
    #[must_use]
    pub fn from_event(event: &ResultEvent, success: bool, error_message: Option<String>) -> Self {
        let usage = event.usage.as_ref();
        Self {
            success,
            error_message,
            cost_usd: event.total_cost_usd.unwrap_or(0.0),
            duration_ms: event.duration_ms.unwrap_or(0),
            num_turns: event.num_turns.unwrap_or(0),
            input_tokens: usage.map_or(0, |u| u.input_tokens),
            output_tokens: usage.map_or(0, |u| u.output_tokens),
            session_id: event.session_id.clone(),
        }
    }

    /// Minimal metadata for an attempt that died without a result event.
    #[must_use]
    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            ..Self::default()
        }
    }

    /// Force the attempt to failed, keeping the usage already captured.
    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.success = false;
        self.error_message = Some(error_message.into());
    }

    /// Duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// Human-readable usage lines, in display order.
    #[must_use]
    pub fn stat_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Success: {}", self.success)];
        if self.num_turns > 0 {
            lines.push(format!("Turns: {}", self.num_turns));
        }
        if self.duration_ms > 0 {
            lines.push(format!("Duration: {:.1}s", self.duration_secs()));
        }
        lines.push(format!("Cost: ${:.6}", self.cost_usd));
        lines.push(format!(
            "Tokens: {} up, {} down",
            self.input_tokens, self.output_tokens
        ));
        if let Some(id) = &self.session_id {
            lines.push(format!("Session ID: {id}"));
        }
        lines
    }

    /// The record appended as the last line of the log file.
    #[must_use]
    pub fn to_record(&self) -> MetadataRecord {
        MetadataRecord {
            success: self.success,
            turns: self.num_turns,
            duration_ms: self.duration_ms,
            duration_s: self.duration_secs(),
            cost_usd: self.cost_usd,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            session_id: self.session_id.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// Wire shape of the metadata line in the log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub success: bool,
    pub turns: u32,
    pub duration_ms: u64,
    pub duration_s: f64,
    pub cost_usd: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
