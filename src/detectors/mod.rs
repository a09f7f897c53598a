//! # Detector Module
//!
//! @title Declarative Detector Registry
//! @author Ramprasad
//!
//! This module compiles declarative detector definitions into an immutable,
//! validated registry shared by every scanning worker.
//!
//! ## Architecture
//!
//! Every [`Detector`] is either **simple** (a line-oriented regex) or
//! **structural** (a relation between two simple detectors: does the
//! evidence detector fire alongside, or inside the region of, the anchor
//! detector). The registry is validated once at load; a malformed definition
//! is a [`ConfigError`] and the scan never starts.
//!
//! ## Built-in Ruleset
//!
//! [`DetectorRegistry::builtin`] loads the Django 4.2 to 5.0 upgrade checks
//! from `builtin.yaml`.

mod definition;

pub use definition::{Category, DetectorDef, DetectorFile, PathRuleDef, Scope};

use crate::error::ConfigError;
use crate::report::Severity;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Built-in detector file, embedded at compile time.
const BUILTIN_DETECTORS: &str = include_str!("builtin.yaml");

/// Default region boundary: the start of a Python function or class.
pub const DEFAULT_BOUNDARY: &str = r"^\s*(?:async\s+def|def|class)\b";

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled unit-level path rule.
#[derive(Debug, Clone)]
pub enum PathRule {
    /// Skip units whose path matches.
    Matching(Pattern),
    /// Skip units whose path does not match.
    NotMatching(Pattern),
}

impl PathRule {
    /// Returns true if this rule excludes the given path.
    pub fn excludes(&self, path: &str) -> bool {
        match self {
            PathRule::Matching(p) => p.matches_with(path, GLOB_OPTIONS),
            PathRule::NotMatching(p) => !p.matches_with(path, GLOB_OPTIONS),
        }
    }
}

/// The relation a structural detector checks.
#[derive(Debug, Clone)]
pub struct Correlation {
    /// Simple detector whose matches start regions.
    pub anchor: String,

    /// Simple detector whose matches must fall inside (or alongside) a region.
    pub evidence: String,

    pub scope: Scope,

    /// Lines matching this pattern end a region.
    pub boundary: Regex,
}

/// What a detector does with a source unit.
#[derive(Debug, Clone)]
pub enum DetectorKind {
    Simple {
        pattern: Regex,
        line_exclusions: Vec<Regex>,
    },
    Structural(Correlation),
}

/// A compiled, validated detector.
#[derive(Debug, Clone)]
pub struct Detector {
    id: String,
    severity: Severity,
    description: String,
    path_rules: Vec<PathRule>,
    kind: DetectorKind,
}

impl Detector {
    /// Compiles a definition. Does not check cross-detector references.
    pub fn compile(def: &DetectorDef) -> Result<Self, ConfigError> {
        let path_rules = def
            .path_exclusions
            .iter()
            .map(|rule| compile_path_rule(&def.id, rule))
            .collect::<Result<Vec<_>, _>>()?;

        reject_misplaced_fields(def)?;

        let kind = match def.category {
            Category::Simple => {
                let pattern = def
                    .pattern
                    .as_deref()
                    .ok_or_else(|| ConfigError::MissingPattern(def.id.clone()))?;
                DetectorKind::Simple {
                    pattern: compile_regex(&def.id, pattern)?,
                    line_exclusions: def
                        .line_exclusions
                        .iter()
                        .map(|p| compile_regex(&def.id, p))
                        .collect::<Result<Vec<_>, _>>()?,
                }
            }
            Category::Structural => {
                let (anchor, evidence) = match (&def.anchor, &def.evidence) {
                    (Some(a), Some(e)) => (a.clone(), e.clone()),
                    _ => return Err(ConfigError::MissingReference(def.id.clone())),
                };
                let boundary = def.boundary.as_deref().unwrap_or(DEFAULT_BOUNDARY);
                DetectorKind::Structural(Correlation {
                    anchor,
                    evidence,
                    scope: def.scope.unwrap_or_default(),
                    boundary: compile_regex(&def.id, boundary)?,
                })
            }
        };

        Ok(Self {
            id: def.id.clone(),
            severity: def.severity,
            description: def.description.clone(),
            path_rules,
            kind,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &DetectorKind {
        &self.kind
    }

    pub fn category(&self) -> Category {
        match self.kind {
            DetectorKind::Simple { .. } => Category::Simple,
            DetectorKind::Structural(_) => Category::Structural,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.category() == Category::Structural
    }

    /// Returns the correlation of a structural detector.
    pub fn correlation(&self) -> Option<&Correlation> {
        match &self.kind {
            DetectorKind::Structural(c) => Some(c),
            DetectorKind::Simple { .. } => None,
        }
    }

    /// Returns true if the path rules let this detector run on `path`.
    pub fn applies_to(&self, path: &str) -> bool {
        !self.path_rules.iter().any(|rule| rule.excludes(path))
    }
}

/// Immutable, validated set of detectors.
///
/// Once loaded the registry is never mutated, so it can be shared by
/// reference across scanning workers without synchronization.
///
/// # Example
///
/// ```rust,ignore
/// let registry = DetectorRegistry::builtin()?;
/// let report = Scanner::new(&registry).scan(&provider);
/// ```
#[derive(Debug, Clone)]
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
    index: HashMap<String, usize>,
}

impl DetectorRegistry {
    /// Compiles and validates a list of definitions.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: a duplicate id, an invalid
    /// pattern or glob, or a structural detector whose anchor or evidence does
    /// not name a simple detector in the same list.
    pub fn load(defs: &[DetectorDef]) -> Result<Self, ConfigError> {
        let detectors = defs
            .iter()
            .map(Detector::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_detectors(detectors)
    }

    /// Loads the built-in ruleset.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_DETECTORS, "built-in detectors")
    }

    /// Parses a YAML detector file held in memory.
    pub fn from_yaml_str(content: &str, what: &str) -> Result<Self, ConfigError> {
        let file: DetectorFile = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            what: what.to_string(),
            source,
        })?;
        Self::load(&file.detectors)
    }

    /// Reads and parses a YAML detector file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    fn from_detectors(detectors: Vec<Detector>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(detectors.len());
        for (i, detector) in detectors.iter().enumerate() {
            if index.insert(detector.id.clone(), i).is_some() {
                return Err(ConfigError::DuplicateId(detector.id.clone()));
            }
        }

        let registry = Self { detectors, index };
        registry.validate_references()?;
        Ok(registry)
    }

    fn validate_references(&self) -> Result<(), ConfigError> {
        for detector in &self.detectors {
            let Some(correlation) = detector.correlation() else {
                continue;
            };
            for (role, target) in [("anchor", &correlation.anchor), ("evidence", &correlation.evidence)] {
                match self.get_detector(target) {
                    None => {
                        return Err(ConfigError::DanglingReference {
                            detector: detector.id.clone(),
                            role,
                            target: target.clone(),
                        })
                    }
                    Some(t) if t.is_structural() => {
                        return Err(ConfigError::NonSimpleReference {
                            detector: detector.id.clone(),
                            role,
                            target: target.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Returns a registry restricted by detector id.
    ///
    /// Ids are compared case-insensitively. An empty `only` keeps every
    /// detector. The result is re-validated, so dropping a detector that a
    /// kept structural detector depends on is an error.
    pub fn filtered(&self, only: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        let known: HashSet<String> = self.detectors.iter().map(|d| d.id.to_lowercase()).collect();
        let only: HashSet<String> = only.iter().map(|s| s.to_lowercase()).collect();
        let exclude: HashSet<String> = exclude.iter().map(|s| s.to_lowercase()).collect();

        if let Some(unknown) = only.iter().chain(exclude.iter()).find(|id| !known.contains(*id)) {
            return Err(ConfigError::UnknownFilterId(unknown.clone()));
        }

        let kept = self
            .detectors
            .iter()
            .filter(|d| {
                let id = d.id.to_lowercase();
                (only.is_empty() || only.contains(&id)) && !exclude.contains(&id)
            })
            .cloned()
            .collect();
        Self::from_detectors(kept)
    }

    /// Returns all detectors in definition order.
    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn simple_detectors(&self) -> impl Iterator<Item = &Detector> {
        self.detectors.iter().filter(|d| !d.is_structural())
    }

    pub fn structural_detectors(&self) -> impl Iterator<Item = &Detector> {
        self.detectors.iter().filter(|d| d.is_structural())
    }

    /// Retrieves a detector by its ID.
    pub fn get_detector(&self, id: &str) -> Option<&Detector> {
        self.index.get(id).map(|&i| &self.detectors[i])
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

fn compile_regex(detector: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        detector: detector.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

/// Rejects fields that only the other category understands.
fn reject_misplaced_fields(def: &DetectorDef) -> Result<(), ConfigError> {
    let (category, misplaced) = match def.category {
        Category::Simple => (
            "simple",
            [
                ("anchor", def.anchor.is_some()),
                ("evidence", def.evidence.is_some()),
                ("scope", def.scope.is_some()),
                ("boundary", def.boundary.is_some()),
            ]
            .into_iter()
            .find_map(|(field, set)| set.then_some(field)),
        ),
        Category::Structural => (
            "structural",
            [
                ("pattern", def.pattern.is_some()),
                ("line_exclusions", !def.line_exclusions.is_empty()),
            ]
            .into_iter()
            .find_map(|(field, set)| set.then_some(field)),
        ),
    };

    match misplaced {
        Some(field) => Err(ConfigError::MisplacedField {
            detector: def.id.clone(),
            category,
            field,
        }),
        None => Ok(()),
    }
}

fn compile_path_rule(detector: &str, rule: &PathRuleDef) -> Result<PathRule, ConfigError> {
    let compile = |glob: &str| {
        Pattern::new(glob).map_err(|source| ConfigError::InvalidGlob {
            detector: detector.to_string(),
            glob: glob.to_string(),
            source,
        })
    };
    match (&rule.matching, &rule.not_matching) {
        (Some(glob), None) => Ok(PathRule::Matching(compile(glob)?)),
        (None, Some(glob)) => Ok(PathRule::NotMatching(compile(glob)?)),
        _ => Err(ConfigError::InvalidPathRule(detector.to_string())),
    }
}
