//! Core runtime configuration.
//!
//! # Responsibility
//! - Carry tunables shared by the storage facade and logging bootstrap.
//! - Validate values before they reach the core.
//!
//! # Invariants
//! - Missing fields deserialize to defaults.
//! - A validated config always has a non-zero debounce window.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Default debounce window for text and checkbox edits.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 500;
/// Upper bound accepted for the debounce window.
pub const MAX_DEBOUNCE_WINDOW_MS: u64 = 10_000;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    DebounceWindowOutOfRange(u64),
    UnsupportedLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DebounceWindowOutOfRange(value) => write!(
                f,
                "debounce_window_ms must be within 1..={MAX_DEBOUNCE_WINDOW_MS}, got {value}"
            ),
            Self::UnsupportedLogLevel(value) => write!(f, "unsupported log level `{value}`"),
        }
    }
}

impl Error for ConfigError {}

/// Tunables for one core instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Quiet period before a debounced edit is committed.
    pub debounce_window_ms: u64,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            log_level: default_log_level().to_string(),
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_window_ms == 0 || self.debounce_window_ms > MAX_DEBOUNCE_WINDOW_MS {
            return Err(ConfigError::DebounceWindowOutOfRange(
                self.debounce_window_ms,
            ));
        }
        normalize_level(&self.log_level)
            .map_err(|_| ConfigError::UnsupportedLogLevel(self.log_level.clone()))?;
        Ok(())
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}
