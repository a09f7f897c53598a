//! # Report Formatters
//!
//! @title Structured, Nested and Markdown Renderings
//! @author Ramprasad
//!
//! Converts a [`ScanReport`] into its two serializable views and into
//! Markdown:
//!
//! - [`StructuredReport`] - flat finding records plus a summary, for machines
//! - [`NestedReport`] - findings grouped by tier and file, for humans
//!
//! Markdown is rendered from the nested view with a Handlebars template.

use super::{ScanReport, Severity, Tier};
use crate::error::UnreadableUnit;
use anyhow::Result;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One flat finding record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingRecord {
    pub detector_id: String,
    pub severity: Severity,
    pub path: String,
    pub line: usize,
    pub matched_text: String,
}

/// Summary object of the structured report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub counts_by_severity: BTreeMap<Severity, usize>,
    pub counts_by_tier: BTreeMap<Tier, usize>,
    pub recommendation: String,
    pub files_scanned: usize,
    pub files_with_findings: usize,
    pub structural_critical_files: usize,
    pub skipped: Vec<UnreadableUnit>,
    pub complete: bool,
}

/// Machine-readable view: an array of records and a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub findings: Vec<FindingRecord>,
    pub summary: StructuredSummary,
}

/// One `path:line` entry of the nested view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedEntry {
    pub location: String,
    pub detector_id: String,
    pub severity: Severity,
    pub matched_text: String,

    /// Comma-separated evidence lines of a structural finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedFile {
    pub path: String,
    pub entries: Vec<NestedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierGroup {
    pub tier: Tier,
    pub heading: String,
    pub files: Vec<NestedFile>,
}

/// Human-readable view: tiers, highest first, each listing its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedReport {
    pub recommendation: String,
    pub files_scanned: usize,
    pub tiers: Vec<TierGroup>,
}

impl ScanReport {
    /// Builds the flat structured view.
    pub fn to_structured(&self) -> StructuredReport {
        let findings = self
            .findings()
            .map(|f| FindingRecord {
                detector_id: f.detector_id.clone(),
                severity: f.severity,
                path: f.path.clone(),
                line: f.line,
                matched_text: f.matched_text.clone(),
            })
            .collect();

        StructuredReport {
            findings,
            summary: StructuredSummary {
                counts_by_severity: self.counts_by_severity(),
                counts_by_tier: self.counts_by_tier.clone(),
                recommendation: self.recommendation.clone(),
                files_scanned: self.files_scanned,
                files_with_findings: self.files_with_findings(),
                structural_critical_files: self.structural_critical_files,
                skipped: self.skipped.clone(),
                complete: self.complete,
            },
        }
    }

    /// Serializes the structured view as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_structured())
    }

    /// Builds the nested, tier-grouped view. Empty tiers are left out.
    pub fn to_nested(&self) -> NestedReport {
        let tiers = Tier::ALL
            .iter()
            .filter_map(|&tier| {
                let files: Vec<NestedFile> = self
                    .file_profiles
                    .iter()
                    .filter(|p| p.tier == tier)
                    .map(|p| NestedFile {
                        path: p.path.clone(),
                        entries: p
                            .findings
                            .iter()
                            .map(|f| NestedEntry {
                                location: format!("{}:{}", f.path, f.line),
                                detector_id: f.detector_id.clone(),
                                severity: f.severity,
                                matched_text: f.matched_text.trim().to_string(),
                                evidence: (!f.related_lines.is_empty()).then(|| {
                                    f.related_lines
                                        .iter()
                                        .map(|l| l.to_string())
                                        .collect::<Vec<_>>()
                                        .join(", ")
                                }),
                            })
                            .collect(),
                    })
                    .collect();

                (!files.is_empty()).then(|| TierGroup {
                    tier,
                    heading: tier.heading().to_string(),
                    files,
                })
            })
            .collect();

        NestedReport {
            recommendation: self.recommendation.clone(),
            files_scanned: self.files_scanned,
            tiers,
        }
    }

    /// Serializes the nested view as YAML.
    pub fn to_nested_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_nested())?)
    }
}

const MARKDOWN_TEMPLATE: &str = r#"# Upgrade Scan Report

| Severity | Findings |
|----------|----------|
{{#each severity_rows}}| {{severity}} | {{count}} |
{{/each}}

- **Files scanned:** {{files_scanned}}
- **Files with findings:** {{files_with_findings}}
- **Critical through structural correlation:** {{structural_critical_files}}
- **Recommendation:** `{{recommendation}}`
{{#unless complete}}
> **Warning:** the scan was cancelled; results are incomplete.
{{/unless}}
{{#each tiers}}

## {{heading}}
{{#each files}}

### `{{path}}`

{{#each entries}}
- `{{location}}` **{{detector_id}}**: `{{matched_text}}`{{#if evidence}} (evidence at line {{evidence}}){{/if}}
{{/each}}
{{/each}}
{{/each}}
{{#if skipped}}

## Skipped files

{{#each skipped}}
- `{{path}}`: {{reason}}
{{/each}}
{{/if}}
"#;

#[derive(Serialize)]
struct SeverityRow {
    severity: Severity,
    count: usize,
}

#[derive(Serialize)]
struct MarkdownContext<'a> {
    severity_rows: Vec<SeverityRow>,
    files_scanned: usize,
    files_with_findings: usize,
    structural_critical_files: usize,
    recommendation: &'a str,
    complete: bool,
    tiers: Vec<TierGroup>,
    skipped: &'a [UnreadableUnit],
}

/// Renders the report as a Markdown document.
pub fn to_markdown(report: &ScanReport) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(handlebars::no_escape);

    let counts = report.counts_by_severity();
    let context = MarkdownContext {
        severity_rows: Severity::ALL
            .iter()
            .map(|s| SeverityRow {
                severity: *s,
                count: counts.get(s).copied().unwrap_or(0),
            })
            .collect(),
        files_scanned: report.files_scanned,
        files_with_findings: report.files_with_findings(),
        structural_critical_files: report.structural_critical_files,
        recommendation: &report.recommendation,
        complete: report.complete,
        tiers: report.to_nested().tiers,
        skipped: &report.skipped,
    };

    Ok(handlebars.render_template(MARKDOWN_TEMPLATE, &context)?)
}
