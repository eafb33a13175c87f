//! Auto Claude - non-interactive Claude Code runs with a readable transcript.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod format;
pub mod runner;
