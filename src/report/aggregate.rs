//! # Risk Aggregation
//!
//! @title File Tiers and Project Recommendation
//! @author Ramprasad
//!
//! Folds per-file findings into [`FileRiskProfile`]s, per-tier counts and a
//! project-wide recommendation label.
//!
//! ## Recommendation Table
//!
//! The recommendation is keyed on the number of files that are Critical
//! because of a Critical **structural** finding. The default table:
//!
//! | Structural-critical files | Label |
//! |---------------------------|-------|
//! | 0 | `no-action-required` |
//! | 1-3 | `mitigate-or-isolate` |
//! | 4+ | `retain-dependency` |

use super::finding::{Finding, Severity, Tier};
use crate::detectors::DetectorRegistry;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Risk classification of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRiskProfile {
    pub path: String,

    /// Findings sorted by line, detector id and matched text.
    pub findings: Vec<Finding>,

    /// Worst severity among the findings.
    pub tier: Tier,

    /// True if a Critical structural finding makes this file Critical.
    pub structural_critical: bool,
}

impl FileRiskProfile {
    /// Builds the profile of one file. Identical findings are collapsed.
    pub fn new(path: String, mut findings: Vec<Finding>, registry: &DetectorRegistry) -> Self {
        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        findings.dedup();

        let tier = Tier::of(&findings);
        let structural_critical = tier == Tier::Critical
            && findings.iter().any(|f| {
                f.severity == Severity::Critical
                    && registry
                        .get_detector(&f.detector_id)
                        .map_or(false, |d| d.is_structural())
            });

        Self {
            path,
            findings,
            tier,
            structural_critical,
        }
    }
}

/// One breakpoint of the recommendation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Smallest structural-critical file count this label applies to.
    pub min: usize,
    pub label: String,
}

impl ThresholdRule {
    pub fn new(min: usize, label: impl Into<String>) -> Self {
        Self {
            min,
            label: label.into(),
        }
    }
}

/// Count-to-label decision table for the project recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationPolicy {
    /// Sorted by `min`, first entry has `min == 0`.
    rules: Vec<ThresholdRule>,
}

impl RecommendationPolicy {
    /// Validates and sorts a table.
    ///
    /// # Errors
    ///
    /// The table must cover zero, must not repeat a breakpoint, and every
    /// label must be non-empty.
    pub fn new(mut rules: Vec<ThresholdRule>) -> Result<Self, ConfigError> {
        rules.sort_by_key(|r| r.min);

        if rules.first().map(|r| r.min) != Some(0) {
            return Err(ConfigError::InvalidThresholds(
                "the table must contain a rule with min: 0".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.min) {
                return Err(ConfigError::InvalidThresholds(format!(
                    "breakpoint {} appears more than once",
                    rule.min
                )));
            }
            if rule.label.trim().is_empty() {
                return Err(ConfigError::InvalidThresholds(format!(
                    "breakpoint {} has an empty label",
                    rule.min
                )));
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// Returns the label of the highest breakpoint not above `count`.
    pub fn recommend(&self, count: usize) -> &str {
        self.rules
            .iter()
            .rev()
            .find(|r| r.min <= count)
            .map(|r| r.label.as_str())
            .unwrap_or_default()
    }
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                ThresholdRule::new(0, "no-action-required"),
                ThresholdRule::new(1, "mitigate-or-isolate"),
                ThresholdRule::new(4, "retain-dependency"),
            ],
        }
    }
}

/// Project-level fold of all file profiles.
#[derive(Debug, Clone)]
pub struct Aggregate {
    /// One profile per distinct path, clean files included.
    pub profiles: Vec<FileRiskProfile>,

    /// Number of files per tier; every tier is present.
    pub counts_by_tier: BTreeMap<Tier, usize>,

    pub structural_critical_files: usize,

    pub recommendation: String,

    /// Number of distinct paths processed.
    pub files_scanned: usize,
}

impl Aggregate {
    pub fn files_with_findings(&self) -> usize {
        self.profiles.iter().filter(|p| p.tier != Tier::Clean).count()
    }
}

/// Folds per-file findings into profiles, counts and a recommendation.
///
/// Entries sharing a path are merged, so the input order and any duplicated
/// units never change the result.
pub fn aggregate(
    findings_by_file: impl IntoIterator<Item = (String, Vec<Finding>)>,
    registry: &DetectorRegistry,
    policy: &RecommendationPolicy,
) -> Aggregate {
    let mut by_path: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
    for (path, findings) in findings_by_file {
        by_path.entry(path).or_default().extend(findings);
    }

    let profiles: Vec<FileRiskProfile> = by_path
        .into_iter()
        .map(|(path, findings)| FileRiskProfile::new(path, findings, registry))
        .collect();

    let mut counts_by_tier: BTreeMap<Tier, usize> = Tier::ALL.iter().map(|t| (*t, 0)).collect();
    for profile in &profiles {
        *counts_by_tier.entry(profile.tier).or_default() += 1;
    }

    let structural_critical_files = profiles.iter().filter(|p| p.structural_critical).count();

    Aggregate {
        files_scanned: profiles.len(),
        recommendation: policy.recommend(structural_critical_files).to_string(),
        structural_critical_files,
        counts_by_tier,
        profiles,
    }
}
