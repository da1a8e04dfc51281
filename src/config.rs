//! Ensemble configuration
//!
//! Keys are camelCase (`numTrees`, `subsampleSize`, ...) and every key is
//! optional, falling back to the documented defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZeroError};
use crate::utils::parallel::ParallelSettings;

/// How the windows of one ensemble member are carved out of its attribute order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Cyclic sliding windows of width `subspaceDimension`, one per start position.
    #[default]
    Sliding,
    /// Every size-`subspaceDimension` subset of the attributes (homogeneous data only).
    Combinatorial,
}

/// Configuration for a ZERO++ ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZeroConfig {
    /// Number of ensemble members (T)
    pub num_trees: usize,
    /// Records drawn per member
    pub subsample_size: usize,
    /// Window width for homogeneous windows (k)
    pub subspace_dimension: usize,
    /// Outer runs averaged into the final score (R)
    pub num_runs: usize,
    /// Reproducibility anchor
    pub base_seed: u64,
    pub window_mode: WindowMode,
    /// Worker threads (0 = all cores, 1 = sequential)
    pub num_threads: usize,
}

impl Default for ZeroConfig {
    fn default() -> Self {
        Self {
            num_trees: 50,
            subsample_size: 8,
            subspace_dimension: 2,
            num_runs: 10,
            base_seed: 1,
            window_mode: WindowMode::Sliding,
            num_threads: 0,
        }
    }
}

impl ZeroConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ZeroError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ZeroError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("numTrees", self.num_trees),
            ("subsampleSize", self.subsample_size),
            ("subspaceDimension", self.subspace_dimension),
            ("numRuns", self.num_runs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ZeroError::Configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Thread settings derived from `num_threads`.
    pub fn parallel_settings(&self) -> ParallelSettings {
        if self.num_threads == 0 {
            ParallelSettings::auto()
        } else {
            ParallelSettings::with_n_threads(self.num_threads)
        }
    }

    pub fn with_num_trees(mut self, num_trees: usize) -> Self {
        self.num_trees = num_trees;
        self
    }

    pub fn with_subsample_size(mut self, subsample_size: usize) -> Self {
        self.subsample_size = subsample_size;
        self
    }

    pub fn with_subspace_dimension(mut self, subspace_dimension: usize) -> Self {
        self.subspace_dimension = subspace_dimension;
        self
    }

    pub fn with_num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs;
        self
    }

    pub fn with_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    pub fn with_window_mode(mut self, window_mode: WindowMode) -> Self {
        self.window_mode = window_mode;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_fallbacks() {
        let config = ZeroConfig::default();
        assert_eq!(config.num_trees, 50);
        assert_eq!(config.subsample_size, 8);
        assert_eq!(config.subspace_dimension, 2);
        assert_eq!(config.num_runs, 10);
        assert_eq!(config.window_mode, WindowMode::Sliding);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ZeroConfig::from_toml_str("numTrees = 5\nbaseSeed = 42\n").unwrap();
        assert_eq!(config.num_trees, 5);
        assert_eq!(config.base_seed, 42);
        assert_eq!(config.subsample_size, 8);
    }

    #[test]
    fn test_window_mode_parses_lowercase() {
        let config = ZeroConfig::from_toml_str("windowMode = \"combinatorial\"").unwrap();
        assert_eq!(config.window_mode, WindowMode::Combinatorial);
    }

    #[test]
    fn test_zero_values_rejected() {
        for key in ["numTrees", "subsampleSize", "subspaceDimension", "numRuns"] {
            let err = ZeroConfig::from_toml_str(&format!("{} = 0", key)).unwrap_err();
            assert!(matches!(err, ZeroError::Configuration(_)), "{}", key);
        }
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ZeroConfig::from_toml_str("numTrees = \"many\"").unwrap_err();
        assert!(matches!(err, ZeroError::ConfigParse(_)));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let config = ZeroConfig::default()
            .with_num_trees(7)
            .with_window_mode(WindowMode::Combinatorial);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = ZeroConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ZeroConfig::from_file("/nonexistent/zeropp.toml").unwrap_err();
        assert!(matches!(err, ZeroError::Io(_)));
    }
}
