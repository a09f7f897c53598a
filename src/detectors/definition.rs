//! # Detector Definitions
//!
//! @title Declarative Detector Schema
//! @author Ramprasad
//!
//! The serializable form of a detector, as written in a YAML detector file.
//! Definitions are compiled and validated by
//! [`DetectorRegistry::load`](super::DetectorRegistry::load).
//!
//! ## Example
//!
//! ```yaml
//! version: "1"
//! detectors:
//!   - id: migration-pytz-call
//!     severity: important
//!     pattern: 'pytz\.\w+'
//!     path_exclusions:
//!       - not_matching: "**/migrations/*.py"
//!   - id: migration-pytz-in-data-function
//!     category: structural
//!     severity: critical
//!     anchor: migration-data-function
//!     evidence: migration-pytz-call
//!     scope: region
//! ```

use crate::report::Severity;
use serde::{Deserialize, Serialize};

/// Whether a detector matches text itself or correlates two other detectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Simple,
    Structural,
}

/// How far from an anchor the evidence of a structural detector may be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Evidence anywhere in the same unit.
    File,

    /// Evidence inside the region owned by the anchor occurrence.
    #[default]
    Region,
}

/// A unit-level path rule. Exactly one of the two fields must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathRuleDef {
    /// Skip units whose path matches this glob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<String>,

    /// Skip units whose path does not match this glob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_matching: Option<String>,
}

impl PathRuleDef {
    pub fn matching(glob: impl Into<String>) -> Self {
        Self {
            matching: Some(glob.into()),
            not_matching: None,
        }
    }

    pub fn not_matching(glob: impl Into<String>) -> Self {
        Self {
            matching: None,
            not_matching: Some(glob.into()),
        }
    }
}

/// One detector as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorDef {
    pub id: String,

    #[serde(default)]
    pub category: Category,

    pub severity: Severity,

    /// Line pattern; required for simple detectors, rejected on structural ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_exclusions: Vec<PathRuleDef>,

    /// Lines matching any of these patterns are not tested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_exclusions: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,

    /// Correlation scope of a structural detector; region when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,

    /// Pattern of lines that start a new definition and end an anchor's region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<String>,
}

impl DetectorDef {
    /// Creates a simple detector definition.
    pub fn simple(id: impl Into<String>, severity: Severity, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: Category::Simple,
            severity,
            pattern: Some(pattern.into()),
            path_exclusions: Vec::new(),
            line_exclusions: Vec::new(),
            description: String::new(),
            anchor: None,
            evidence: None,
            scope: None,
            boundary: None,
        }
    }

    /// Creates a structural detector definition.
    pub fn structural(
        id: impl Into<String>,
        severity: Severity,
        anchor: impl Into<String>,
        evidence: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            id: id.into(),
            category: Category::Structural,
            severity,
            pattern: None,
            path_exclusions: Vec::new(),
            line_exclusions: Vec::new(),
            description: String::new(),
            anchor: Some(anchor.into()),
            evidence: Some(evidence.into()),
            scope: Some(scope),
            boundary: None,
        }
    }

    pub fn with_path_rule(mut self, rule: PathRuleDef) -> Self {
        self.path_exclusions.push(rule);
        self
    }

    pub fn with_line_exclusion(mut self, pattern: impl Into<String>) -> Self {
        self.line_exclusions.push(pattern.into());
        self
    }
}

/// Top-level layout of a detector file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorFile {
    #[serde(default = "default_version")]
    pub version: String,

    pub detectors: Vec<DetectorDef>,
}

fn default_version() -> String {
    "1".to_string()
}
