//! # Error Types
//!
//! @title Configuration and Source Errors
//! @author Ramprasad
//!
//! Fatal configuration errors raised while loading detectors or policy, and
//! the non-fatal per-unit error raised when a source file cannot be read.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal error raised while loading a detector registry or scan policy.
///
/// A scan never starts with a registry that produced one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate detector id '{0}'")]
    DuplicateId(String),

    #[error("detector '{detector}' references unknown {role} detector '{target}'")]
    DanglingReference {
        detector: String,
        role: &'static str,
        target: String,
    },

    #[error("detector '{detector}' uses '{target}' as {role}, but only simple detectors can be referenced")]
    NonSimpleReference {
        detector: String,
        role: &'static str,
        target: String,
    },

    #[error("structural detector '{0}' must declare both an anchor and an evidence detector")]
    MissingReference(String),

    #[error("{category} detector '{detector}' does not accept '{field}'")]
    MisplacedField {
        detector: String,
        category: &'static str,
        field: &'static str,
    },

    #[error("simple detector '{0}' has no pattern")]
    MissingPattern(String),

    #[error("path rule in detector '{0}' must set exactly one of 'matching' or 'not_matching'")]
    InvalidPathRule(String),

    #[error("invalid regex pattern '{pattern}' in detector '{detector}': {source}")]
    InvalidPattern {
        detector: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob '{glob}' in detector '{detector}': {source}")]
    InvalidGlob {
        detector: String,
        glob: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("unknown detector id '{0}' in filter")]
    UnknownFilterId(String),

    #[error("invalid recommendation table: {0}")]
    InvalidThresholds(String),

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A source unit that could not be read or decoded as text.
///
/// Skipped units contribute no findings and are reported separately.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{path}: {reason}")]
pub struct UnreadableUnit {
    pub path: String,
    pub reason: String,
}

impl UnreadableUnit {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
