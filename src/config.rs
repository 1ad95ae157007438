//! Engine configuration
//!
//! Tunables for the hash table, undo history, search tokenizer and the exact
//! optimizer. Loaded from TOML by hosts; every field has a default.

use crate::error::{Result, TaskError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Largest task count the bitmask optimizer will ever accept, regardless of
/// configuration. `2^25` DP states already need several hundred megabytes.
pub const OPTIMIZER_HARD_LIMIT: usize = 25;

/// Accepted range for the task store load factor
pub const LOAD_FACTOR_RANGE: std::ops::RangeInclusive<f64> = 0.1..=10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial bucket count of the task store
    pub initial_buckets: usize,
    /// Entries per bucket that trigger a resize
    pub load_factor: f64,
    /// Maximum number of undoable commands kept
    pub history_capacity: usize,
    /// Largest pending-task count accepted by `optimize_order`
    pub max_optimizer_tasks: usize,
    /// Words of this length or shorter are not indexed
    pub min_word_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_buckets: 16,
            load_factor: 0.75,
            history_capacity: 100,
            max_optimizer_tasks: 20,
            min_word_len: 2,
        }
    }
}

impl EngineConfig {
    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.initial_buckets == 0 {
            return Err(TaskError::Config(
                "initial_buckets must be at least 1".to_string(),
            ));
        }
        if !LOAD_FACTOR_RANGE.contains(&self.load_factor) {
            return Err(TaskError::Config(format!(
                "load_factor must be between {} and {}, got {}",
                LOAD_FACTOR_RANGE.start(),
                LOAD_FACTOR_RANGE.end(),
                self.load_factor
            )));
        }
        if self.history_capacity == 0 {
            return Err(TaskError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_optimizer_tasks > OPTIMIZER_HARD_LIMIT {
            return Err(TaskError::Config(format!(
                "max_optimizer_tasks {} exceeds hard limit {}",
                self.max_optimizer_tasks, OPTIMIZER_HARD_LIMIT
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| TaskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TaskError::Config(e.to_string()))
    }

    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine configuration from {:?}", path);
        let content = fs::read_to_string(path)
            .map_err(|e| TaskError::Config(format!("failed to read {:?}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content)
            .map_err(|e| TaskError::Config(format!("failed to write {:?}: {}", path, e)))?;
        Ok(())
    }
}
