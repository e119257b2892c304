//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a
//! valid configuration:
//!
//! ```json
//! {
//!   "matcher": { "fuzzy_threshold": 0.85, "max_length_delta": 5 },
//!   "runtime": { "queue_capacity": 4 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default place names that never resolve: out-of-state cities, bare
/// directionals and street-suffix fragments that collide with real aliases.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "portland",
    "boston",
    "orlando",
    "west",
    "north",
    "east",
    "south",
    "ave",
    "bedford",
    "benn",
    "bradenton",
    "che",
];

/// Matcher tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// A fuzzy candidate is accepted when its score is strictly above this.
    pub fuzzy_threshold: f64,
    /// Alias keys whose length differs from the input by more than this are skipped.
    pub max_length_delta: usize,
    /// Inputs shorter than this (in characters) never reach fuzzy matching.
    pub min_fuzzy_len: usize,
    /// Keys that short-circuit to `not_found`.
    pub blocklist: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            max_length_delta: 5,
            min_fuzzy_len: 3,
            blocklist: DEFAULT_BLOCKLIST.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Worker runtime tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum queued batch jobs.
    pub queue_capacity: usize,
    /// Worker thread name.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            thread_name: "townmatch-worker".to_string(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Matcher tuning.
    pub matcher: MatcherConfig,
    /// Worker runtime tuning.
    pub runtime: RuntimeConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid JSON and
    /// [`ConfigError::OutOfRange`] for values [`Self::validate`] rejects.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse { message: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, or any error
    /// from [`Self::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] when the threshold is outside
    /// `[0, 1]` or the queue capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.matcher.fuzzy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::OutOfRange {
                field: "matcher.fuzzy_threshold",
                value: threshold.to_string(),
            });
        }
        if self.runtime.queue_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                field: "runtime.queue_capacity",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
