//! Configuration for quantum query evaluation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CqqlError, Result};
use crate::util::CancellationToken;

/// The boost value that carries no weighting information.
pub const NEUTRAL_BOOST: f32 = 1.0;

/// Bounds applied while normalizing a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Maximum nesting of overlap splits.
    pub max_depth: usize,

    /// Maximum number of overlap splits for one formula.
    pub max_nodes: usize,

    /// Maximum number of disjuncts produced by DNF conversion.
    pub max_disjuncts: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 100_000,
            max_disjuncts: 65_536,
        }
    }
}

impl NormalizerConfig {
    /// Set the maximum split depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum number of splits.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Set the maximum number of DNF disjuncts.
    pub fn with_max_disjuncts(mut self, max_disjuncts: usize) -> Self {
        self.max_disjuncts = max_disjuncts;
        self
    }
}

/// Configuration for preparing and scoring a commuting quantum query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantumConfig {
    /// Normalization bounds.
    pub normalizer: NormalizerConfig,

    /// Time budget for preparing and scoring one query.
    /// If None, the query runs until it completes.
    pub timeout: Option<Duration>,

    /// Build score matrix rows in parallel.
    pub parallel_matrix: bool,
}

impl Default for QuantumConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            timeout: None,
            parallel_matrix: true,
        }
    }
}

impl QuantumConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: QuantumConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every bound is usable.
    pub fn validate(&self) -> Result<()> {
        if self.normalizer.max_depth == 0 {
            return Err(CqqlError::invalid_argument(
                "normalizer.max_depth must be at least 1",
            ));
        }
        if self.normalizer.max_disjuncts == 0 {
            return Err(CqqlError::invalid_argument(
                "normalizer.max_disjuncts must be at least 1",
            ));
        }
        Ok(())
    }

    /// Set the normalizer bounds.
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable parallel matrix construction.
    pub fn with_parallel_matrix(mut self, parallel: bool) -> Self {
        self.parallel_matrix = parallel;
        self
    }

    /// Create a cancellation token honouring the configured timeout.
    pub fn cancellation_token(&self) -> CancellationToken {
        match self.timeout {
            Some(timeout) => CancellationToken::with_timeout(timeout),
            None => CancellationToken::new(),
        }
    }
}
