//! Retry state machine for one run.

use crate::config::{has_resume, with_resume};
use crate::error::RunError;

/// Current state of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    /// Attempt `n`, 1-based.
    Attempt(u32),
    Succeeded,
    Failed,
}

/// Attempt bookkeeping, mutated only between attempts.
#[derive(Debug, Clone)]
pub struct RetryState {
    state: RunState,
    attempt: u32,
    max_attempts: u32,
    last_session_id: Option<String>,
    last_error: Option<String>,
}

impl RetryState {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: RunState::Idle,
            attempt: 0,
            max_attempts: max_attempts.max(1),
            last_session_id: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn last_session_id(&self) -> Option<&str> {
        self.last_session_id.as_deref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn transition(&mut self, new_state: RunState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "Run state transition");
        self.state = new_state;
    }

    /// Enter the next attempt and return its number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt = self.attempt.saturating_add(1);
        self.transition(RunState::Attempt(self.attempt));
        self.attempt
    }

    /// Options for the current attempt.
    ///
    /// From the second attempt on, a recovered session id is resumed unless
    /// the caller already passed a resume directive. Returns the options and
    /// whether a directive was added.
    #[must_use]
    pub fn options_for_attempt(&self, base: &[String]) -> (Vec<String>, bool) {
        match &self.last_session_id {
            Some(id) if self.attempt > 1 && !has_resume(base) => (with_resume(base, id), true),
            _ => (base.to_vec(), false),
        }
    }

    /// Remember what a failed attempt left behind.
    ///
    /// A missing session id keeps the previous one so the conversation can
    /// still be resumed.
    pub fn record_failure(&mut self, session_id: Option<String>, error: &RunError) {
        if session_id.is_some() {
            self.last_session_id = session_id;
        }
        self.last_error = Some(error.to_string());
    }

    /// Decide whether a failed attempt is followed by another one.
    ///
    /// `captured_metadata` is false when the attempt died before the CLI
    /// produced anything; there is nothing to resume then.
    #[must_use]
    pub fn should_retry(&self, error: &RunError, captured_metadata: bool) -> bool {
        error.is_retryable() && captured_metadata && self.attempt < self.max_attempts
    }

    pub fn succeed(&mut self) {
        self.transition(RunState::Succeeded);
    }

    pub fn fail(&mut self) {
        self.transition(RunState::Failed);
    }
}
