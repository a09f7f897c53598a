//! # Configuration Module
//!
//! @title Scan Configuration
//! @author Ramprasad
//!
//! Optional `upgrade-sentinel.yaml` file controlling which files are scanned,
//! which detector file is used and the recommendation threshold table.
//!
//! ## Example
//!
//! ```yaml
//! detectors: ci/detectors.yaml
//! include: ["**/*.py"]
//! skip_dirs: [venv, .venv, __pycache__]
//! full_coverage: false
//! recommendation:
//!   - { min: 0, label: no-action-required }
//!   - { min: 1, label: mitigate-or-isolate }
//!   - { min: 4, label: retain-dependency }
//! ```

use crate::detectors::DetectorRegistry;
use crate::error::ConfigError;
use crate::report::{RecommendationPolicy, ThresholdRule};
use crate::source::{DEFAULT_INCLUDE, DEFAULT_SKIP_DIRS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the scan root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "upgrade-sentinel.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Detector file; relative paths resolve against the config file's directory.
    pub detectors: Option<PathBuf>,

    /// Globs of files to scan, relative to the scan root.
    pub include: Vec<String>,

    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,

    /// Include clean files in the report body.
    pub full_coverage: bool,

    /// Recommendation threshold table.
    pub recommendation: Vec<ThresholdRule>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detectors: None,
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            full_coverage: false,
            recommendation: RecommendationPolicy::default().rules().to_vec(),
        }
    }
}

impl ScanConfig {
    /// Parses a configuration held in memory.
    pub fn from_yaml_str(content: &str, what: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            what: what.to_string(),
            source,
        })
    }

    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&content, &path.display().to_string())?;

        if let (Some(detectors), Some(dir)) = (&config.detectors, path.parent()) {
            if detectors.is_relative() {
                config.detectors = Some(dir.join(detectors));
            }
        }
        Ok(config)
    }

    /// Loads `upgrade-sentinel.yaml` from `root` if present, else defaults.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let dir = if root.is_file() {
            root.parent().unwrap_or(Path::new("."))
        } else {
            root
        };
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            log::info!("Using configuration {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Validated recommendation policy.
    pub fn policy(&self) -> Result<RecommendationPolicy, ConfigError> {
        RecommendationPolicy::new(self.recommendation.clone())
    }

    /// Detector registry named by the config, or the built-in ruleset.
    pub fn registry(&self) -> Result<DetectorRegistry, ConfigError> {
        match &self.detectors {
            Some(path) => DetectorRegistry::from_yaml_file(path),
            None => DetectorRegistry::builtin(),
        }
    }
}
