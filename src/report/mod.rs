//! # Report Generation Module
//!
//! @title Scan Report Assembly
//! @author Ramprasad
//!
//! Assembles the deterministic [`ScanReport`] and renders it as terminal
//! output, a flat structured document, a nested tier-grouped document,
//! Markdown and GitHub Actions annotations.
//!
//! Every rendering is derived from the same `ScanReport` value.
//!
//! ## Key Types
//!
//! - [`ScanReport`] - Complete scan result
//! - [`FileRiskProfile`] - Per-file tier and findings
//! - [`Finding`] - Individual detector match
//! - [`Severity`] / [`Tier`] - Detector and file classification

mod aggregate;
mod finding;
mod formatter;

pub use aggregate::{aggregate, Aggregate, FileRiskProfile, RecommendationPolicy, ThresholdRule};
pub use finding::{Finding, Severity, Tier};
pub use formatter::*;

use crate::error::UnreadableUnit;
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete result of a scan.
///
/// Contains no timestamp, so scanning unchanged input twice yields equal
/// reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Tool version used for the scan.
    pub version: String,

    /// File profiles sorted by path. Clean files appear only with full coverage.
    pub file_profiles: Vec<FileRiskProfile>,

    /// Number of scanned files per tier, clean files included.
    pub counts_by_tier: BTreeMap<Tier, usize>,

    /// Project recommendation label.
    pub recommendation: String,

    /// Files Critical because of a Critical structural finding.
    pub structural_critical_files: usize,

    /// Number of files successfully scanned.
    pub files_scanned: usize,

    /// Units that could not be read, sorted by path.
    pub skipped: Vec<UnreadableUnit>,

    /// False if the scan was cancelled before every unit was processed.
    pub complete: bool,
}

impl ScanReport {
    /// Assembles the report from an aggregate.
    ///
    /// Sorts profiles and skipped units by path so the report does not depend
    /// on the order units were delivered or processed in.
    pub fn assemble(
        aggregate: Aggregate,
        mut skipped: Vec<UnreadableUnit>,
        complete: bool,
        full_coverage: bool,
    ) -> Self {
        let mut file_profiles: Vec<FileRiskProfile> = aggregate
            .profiles
            .into_iter()
            .filter(|p| full_coverage || p.tier != Tier::Clean)
            .collect();
        file_profiles.sort_by(|a, b| a.path.cmp(&b.path));

        skipped.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.reason.cmp(&b.reason)));
        skipped.dedup();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            file_profiles,
            counts_by_tier: aggregate.counts_by_tier,
            recommendation: aggregate.recommendation,
            structural_critical_files: aggregate.structural_critical_files,
            files_scanned: aggregate.files_scanned,
            skipped,
            complete,
        }
    }

    /// Iterates over every finding in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.file_profiles.iter().flat_map(|p| p.findings.iter())
    }

    /// Number of findings per severity; every severity is present.
    pub fn counts_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for finding in self.findings() {
            *counts.entry(finding.severity).or_default() += 1;
        }
        counts
    }

    /// Number of files with at least one finding.
    pub fn files_with_findings(&self) -> usize {
        self.file_profiles
            .iter()
            .filter(|p| p.tier != Tier::Clean)
            .count()
    }

    /// True when the report should fail a CI pipeline: any Critical finding.
    pub fn gates_ci(&self) -> bool {
        self.findings().any(|f| f.severity == Severity::Critical)
    }

    /// Prints findings grouped by tier to the terminal.
    pub fn print_terminal(&self) {
        if self.files_with_findings() == 0 {
            println!("\n{}", "[+] No deprecated or removed API usage found.".green().bold());
        }

        for tier in Tier::ALL {
            let profiles: Vec<&FileRiskProfile> =
                self.file_profiles.iter().filter(|p| p.tier == tier).collect();
            if profiles.is_empty() {
                continue;
            }

            println!("\n{} {}", tier.colored_label(), tier.heading().bold());
            println!("{}", "=".repeat(60).cyan());
            for profile in profiles {
                println!("  {}", profile.path.white().bold());
                for finding in &profile.findings {
                    finding.print_terminal();
                }
            }
        }

        if !self.skipped.is_empty() {
            println!("\n{}", "[!] Skipped files:".yellow().bold());
            for unit in &self.skipped {
                println!("    {} {}", unit.path.blue(), unit.reason.dimmed());
            }
        }
    }

    /// Prints summary statistics to the terminal.
    pub fn print_summary(&self) {
        let counts = self.counts_by_severity();
        println!(
            "{}",
            format!(
                "[*] Summary: {} Critical | {} Important | {} Deprecated",
                counts[&Severity::Critical],
                counts[&Severity::Important],
                counts[&Severity::Deprecated]
            )
            .bold()
        );
        println!(
            "[*] Files scanned: {} | with findings: {} | skipped: {}",
            self.files_scanned,
            self.files_with_findings(),
            self.skipped.len()
        );

        let message = format!(
            "[*] Recommendation: {} ({} file(s) critical through structural correlation)",
            self.recommendation, self.structural_critical_files
        );
        if self.structural_critical_files > 0 {
            println!("{}", message.red().bold());
        } else {
            println!("{}", message.green().bold());
        }

        if !self.complete {
            println!("{}", "[!] Scan was cancelled; results are incomplete".yellow().bold());
        }
    }

    /// Converts the report to Markdown format.
    pub fn to_markdown(&self) -> anyhow::Result<String> {
        formatter::to_markdown(self)
    }

    /// Renders GitHub Actions workflow annotations, one per finding.
    ///
    /// Format: `::error file={path},line={line},title={id}::{text}`
    pub fn github_annotations(&self) -> Vec<String> {
        self.findings()
            .map(|f| {
                let level = match f.severity {
                    Severity::Critical => "error",
                    Severity::Important => "warning",
                    Severity::Deprecated => "notice",
                };
                format!(
                    "::{} file={},line={},title={}::{}",
                    level,
                    f.path,
                    f.line,
                    f.detector_id,
                    f.matched_text.trim()
                )
            })
            .collect()
    }
}
