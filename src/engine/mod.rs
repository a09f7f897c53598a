//! # Scan Engine
//!
//! @title Match Engine and Scan Pipeline
//! @author Ramprasad
//!
//! Runs the detectors of a [`DetectorRegistry`] over source units and turns
//! the results into a [`ScanReport`].
//!
//! ## Pipeline
//!
//! 1. **Match** - [`scan_unit`] applies every simple detector line by line
//! 2. **Correlate** - [`correlation::resolve`] adds structural findings
//! 3. **Aggregate** - [`aggregate`] classifies files and picks a recommendation
//! 4. **Assemble** - [`ScanReport::assemble`] sorts everything into the report
//!
//! Steps 1 and 2 run per unit on the rayon pool. The registry is shared
//! read-only, and every later step re-sorts, so worker scheduling never
//! affects the output.

pub mod correlation;
pub mod region;

use crate::detectors::{DetectorKind, DetectorRegistry};
use crate::error::UnreadableUnit;
use crate::report::{aggregate, Finding, RecommendationPolicy, ScanReport};
use crate::source::{SourceProvider, SourceResult, SourceUnit};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Applies every simple detector to one unit.
///
/// Path rules are checked once per unit; a detector excluded for this path
/// never sees its lines. Each non-overlapping match yields one finding with
/// the 1-based line number and the exact matched text. Findings of different
/// detectors on the same line are all kept.
pub fn scan_unit(unit: &SourceUnit, registry: &DetectorRegistry) -> Vec<Finding> {
    let mut findings = Vec::new();

    for detector in registry.simple_detectors() {
        let DetectorKind::Simple {
            pattern,
            line_exclusions,
        } = detector.kind()
        else {
            continue;
        };
        if !detector.applies_to(&unit.path) {
            continue;
        }

        for (idx, line) in unit.lines.iter().enumerate() {
            if line_exclusions.iter().any(|e| e.is_match(line)) {
                continue;
            }
            for m in pattern.find_iter(line) {
                findings.push(Finding {
                    detector_id: detector.id().to_string(),
                    severity: detector.severity(),
                    path: unit.path.clone(),
                    line: idx + 1,
                    matched_text: m.as_str().to_string(),
                    related_lines: Vec::new(),
                });
            }
        }
    }

    findings
}

/// Runs matching and correlation for one unit.
pub fn analyze_unit(unit: &SourceUnit, registry: &DetectorRegistry) -> Vec<Finding> {
    let mut findings = scan_unit(unit, registry);
    let structural = correlation::resolve(unit, &findings, registry);
    findings.extend(structural);
    log::debug!("{}: {} finding(s)", unit.path, findings.len());
    findings
}

/// Shared flag that stops a scan from dispatching further units.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a full scan: match, correlate, aggregate, assemble.
///
/// # Example
///
/// ```rust,ignore
/// let registry = DetectorRegistry::builtin()?;
/// let report = Scanner::new(&registry)
///     .with_full_coverage(true)
///     .scan(&FsProvider::new("./project"));
/// ```
pub struct Scanner<'a> {
    registry: &'a DetectorRegistry,
    policy: RecommendationPolicy,
    full_coverage: bool,
    cancel: Option<CancelToken>,
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a DetectorRegistry) -> Self {
        Self {
            registry,
            policy: RecommendationPolicy::default(),
            full_coverage: false,
            cancel: None,
        }
    }

    /// Replaces the recommendation threshold table.
    pub fn with_policy(mut self, policy: RecommendationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Includes clean files in the report body.
    pub fn with_full_coverage(mut self, full_coverage: bool) -> Self {
        self.full_coverage = full_coverage;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Scans every unit the provider yields.
    pub fn scan(&self, provider: &dyn SourceProvider) -> ScanReport {
        self.scan_results(provider.units())
    }

    /// Scans an already-produced sequence of units.
    ///
    /// Unreadable units are recorded as skipped and contribute nothing else.
    pub fn scan_results(&self, results: impl IntoIterator<Item = SourceResult>) -> ScanReport {
        let mut units = Vec::new();
        let mut skipped: Vec<UnreadableUnit> = Vec::new();

        for result in results {
            match result {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    log::warn!("Skipping {}", e);
                    skipped.push(e);
                }
            }
        }

        let processed: Vec<Option<(String, Vec<Finding>)>> = units
            .par_iter()
            .map(|unit| {
                if self.is_cancelled() {
                    return None;
                }
                Some((unit.path.clone(), analyze_unit(unit, self.registry)))
            })
            .collect();

        let complete = processed.iter().all(Option::is_some);
        if !complete {
            log::warn!("Scan cancelled; report is incomplete");
        }

        let summary = aggregate(processed.into_iter().flatten(), self.registry, &self.policy);
        log::info!(
            "Scanned {} file(s), {} with findings, {} skipped",
            summary.files_scanned,
            summary.files_with_findings(),
            skipped.len()
        );

        ScanReport::assemble(summary, skipped, complete, self.full_coverage)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
    }
}
