//! Worker configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_queue_name() -> String {
    "consoleworker".into()
}

fn default_poll_timeout_seconds() -> u64 {
    5
}

/// Worker configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Human-readable worker name, used to prefix the worker's own log lines.
    pub name: String,
    /// Local socket name of the operator command queue.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Prefix for redirected diagnostic lines.
    ///
    /// Defaults to `"<name> Diagnostics"`; an empty string disables the prefix.
    #[serde(default)]
    pub diagnostics_prefix: Option<String>,
    /// Seconds a single command poll may block.
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
    /// Seconds to wait before the command loop starts.
    #[serde(default)]
    pub launch_wait_seconds: u64,
    /// Log the resolved configuration and raise diagnostic verbosity.
    #[serde(default)]
    pub debug: bool,
}

impl WorkerConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Timeout applied to each command poll.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }

    /// Delay before the command loop starts.
    #[must_use]
    pub fn launch_wait(&self) -> Duration {
        Duration::from_secs(self.launch_wait_seconds)
    }

    /// Effective prefix for redirected diagnostic lines, if any.
    #[must_use]
    pub fn diagnostics_prefix(&self) -> Option<String> {
        match &self.diagnostics_prefix {
            Some(prefix) if prefix.is_empty() => None,
            Some(prefix) => Some(prefix.clone()),
            None => Some(format!("{} Diagnostics", self.name)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Config("name must not be empty".into()));
        }

        if self.queue_name.trim().is_empty() {
            return Err(AppError::Config("queue_name must not be empty".into()));
        }

        if self.poll_timeout_seconds == 0 {
            return Err(AppError::Config(
                "poll_timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
