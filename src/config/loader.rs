//! Configuration file loader.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::DEFAULT_BINARY;

/// Settings loaded from a TOML file. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Claude Code binary to run.
    pub claude_binary: String,
    /// Attempts per run when retrying is enabled.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay_ms: u64,
    /// Lines of the prompt echoed before each attempt.
    pub prompt_max_lines: usize,
    /// Lines shown per transcript message.
    pub message_max_lines: usize,
    /// Render tool results in the transcript.
    pub show_tool_results: bool,
    /// Where unrecognized tool invocations are appended.
    /// Defaults to `~/.claude/unhandled_message_types.txt`.
    pub unhandled_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            claude_binary: DEFAULT_BINARY.to_string(),
            max_attempts: 3,
            retry_delay_ms: 1000,
            prompt_max_lines: 5,
            message_max_lines: 5,
            show_tool_results: false,
            unhandled_log: None,
        }
    }
}

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
    /// Fail instead of falling back to defaults when nothing is found.
    required: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .auto-claude.toml
        search_paths.push(PathBuf::from(".auto-claude.toml"));

        // 2. User config directory: ~/.config/auto-claude/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("auto-claude").join("config.toml"));
        }

        Self {
            search_paths,
            required: false,
        }
    }

    /// Create a config loader for an explicitly requested file.
    ///
    /// Unlike the default search, a missing file is an error.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
            required: true,
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or an
    /// explicitly requested file does not exist.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        if let Some(path) = self.find_config_file() {
            tracing::debug!(path = %path.display(), "Loading config file");
            return Self::load_from_path(&path);
        }

        if self.required {
            if let Some(path) = self.search_paths.first() {
                return Err(ConfigError::NotFound(path.clone()));
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Settings::default())
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.is_file()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
