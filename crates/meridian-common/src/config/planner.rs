//! Planner configuration structures.
//!
//! Runtime options describe the backend the plan will run on (the I/O read
//! size drives the external sort estimate). Query options are per-query
//! settings that cost computation receives but mostly passes through.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_READ_SIZE, MAX_READ_SIZE, MIN_READ_SIZE};
use crate::error::{PlannerError, PlannerResult};

/// Detail level for plan explain output.
///
/// Levels are ordered: each level prints everything the previous one does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExplainLevel {
    /// Node ids, names, and schema only.
    Minimal,
    /// Adds predicates, ordering, limit and offset.
    #[default]
    Standard,
    /// Adds cost and statistics diagnostics.
    Extended,
}

impl fmt::Display for ExplainLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExplainLevel::Minimal => "minimal",
            ExplainLevel::Standard => "standard",
            ExplainLevel::Extended => "extended",
        };
        f.write_str(name)
    }
}

impl FromStr for ExplainLevel {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" | "0" => Ok(ExplainLevel::Minimal),
            "standard" | "1" => Ok(ExplainLevel::Standard),
            "extended" | "2" => Ok(ExplainLevel::Extended),
            other => Err(PlannerError::invalid_config(format!(
                "unknown explain level '{other}'"
            ))),
        }
    }
}

/// Backend runtime options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// I/O read size in bytes; also the external sorter's block size.
    /// Default: 8388608 (8 MB)
    #[serde(default = "default_read_size")]
    pub read_size: u64,
}

fn default_read_size() -> u64 {
    DEFAULT_READ_SIZE
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            read_size: default_read_size(),
        }
    }
}

impl RuntimeOptions {
    /// Returns options with the given read size.
    #[must_use]
    pub fn with_read_size(mut self, read_size: u64) -> Self {
        self.read_size = read_size;
        self
    }

    /// Returns the read size, the block size the external sorter uses.
    #[inline]
    #[must_use]
    pub const fn read_size(&self) -> u64 {
        self.read_size
    }
}

/// Per-query options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Explain detail level.
    #[serde(default)]
    pub explain_level: ExplainLevel,

    /// Plan the outermost ORDER BY ... LIMIT as a full sort.
    #[serde(default)]
    pub disable_outermost_topn: bool,
}

/// Top-level planner configuration.
///
/// # Example
///
/// ```rust
/// use meridian_common::config::PlannerConfig;
///
/// let config = PlannerConfig::from_toml_str("[runtime]\nread_size = 1048576\n").unwrap();
/// assert_eq!(config.runtime.read_size, 1048576);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Runtime options.
    #[serde(default)]
    pub runtime: RuntimeOptions,

    /// Default query options.
    #[serde(default)]
    pub query: QueryOptions,
}

impl PlannerConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PlannerResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn from_file(path: &Path) -> PlannerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> PlannerResult<()> {
        let read_size = self.runtime.read_size;
        if !(MIN_READ_SIZE..=MAX_READ_SIZE).contains(&read_size) {
            return Err(PlannerError::invalid_config(format!(
                "read_size must be between {MIN_READ_SIZE} and {MAX_READ_SIZE} bytes, got {read_size}"
            )));
        }
        Ok(())
    }
}
