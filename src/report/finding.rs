//! # Finding, Severity and Tier Definitions
//!
//! @title Scan Finding Data Structures
//! @author Ramprasad
//!
//! Defines the core data structures for representing detector findings
//! and the risk tiers files are classified into.

use colored::*;
use serde::{Deserialize, Serialize};

/// Severity level assigned to a detector and every finding it produces.
///
/// Ordered from lowest to highest severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Deprecated API, scheduled for removal in a later release.
    Deprecated = 1,

    /// Behavior change that may break the application depending on usage.
    Important = 2,

    /// Removed API or change that will break the application.
    Critical = 3,
}

impl Severity {
    /// All severities, highest first.
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Important, Severity::Deprecated];

    /// Returns a colored label for terminal output.
    pub fn colored_label(&self) -> ColoredString {
        match self {
            Severity::Critical => "CRITICAL".white().on_red().bold(),
            Severity::Important => "IMPORTANT".black().on_yellow().bold(),
            Severity::Deprecated => "DEPRECATED".white().on_bright_blue().bold(),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Important => write!(f, "important"),
            Severity::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// Risk tier of a file: the worst severity among its findings, or `Clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Clean = 0,
    Deprecated = 1,
    Important = 2,
    Critical = 3,
}

impl Tier {
    /// All tiers, highest first.
    pub const ALL: [Tier; 4] = [Tier::Critical, Tier::Important, Tier::Deprecated, Tier::Clean];

    /// Computes the tier for a set of findings.
    pub fn of<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        findings
            .into_iter()
            .map(|f| Tier::from(f.severity))
            .max()
            .unwrap_or(Tier::Clean)
    }

    /// Human-readable heading used by the nested report.
    pub fn heading(&self) -> &'static str {
        match self {
            Tier::Critical => "Critical issues (must fix before upgrade)",
            Tier::Important => "Important changes (should fix)",
            Tier::Deprecated => "Deprecated features (plan for future)",
            Tier::Clean => "Clean files",
        }
    }

    /// Returns a colored label for terminal output.
    pub fn colored_label(&self) -> ColoredString {
        match self {
            Tier::Critical => "CRITICAL".red().bold(),
            Tier::Important => "IMPORTANT".yellow().bold(),
            Tier::Deprecated => "DEPRECATED".blue().bold(),
            Tier::Clean => "CLEAN".green().bold(),
        }
    }
}

impl From<Severity> for Tier {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Tier::Critical,
            Severity::Important => Tier::Important,
            Severity::Deprecated => Tier::Deprecated,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Critical => write!(f, "critical"),
            Tier::Important => write!(f, "important"),
            Tier::Deprecated => write!(f, "deprecated"),
            Tier::Clean => write!(f, "clean"),
        }
    }
}

/// A single detector match at a concrete source location.
///
/// Simple detectors produce one finding per pattern match. Structural
/// detectors produce one finding per correlated anchor occurrence, located
/// at the anchor and listing the evidence lines that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// ID of the detector that produced this finding.
    pub detector_id: String,

    /// Severity copied from the detector.
    pub severity: Severity,

    /// Path of the source unit, forward-slash separated.
    pub path: String,

    /// 1-based line number.
    pub line: usize,

    /// The exact matched substring.
    pub matched_text: String,

    /// Evidence lines for structural findings; empty for simple findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_lines: Vec<usize>,
}

impl Finding {
    /// Returns true if this finding was synthesized by a structural detector.
    pub fn is_structural(&self) -> bool {
        !self.related_lines.is_empty()
    }

    /// Ordering key used to make per-file finding lists deterministic.
    pub(crate) fn sort_key(&self) -> (usize, &str, &str, &[usize]) {
        (
            self.line,
            self.detector_id.as_str(),
            self.matched_text.as_str(),
            self.related_lines.as_slice(),
        )
    }

    /// Prints the finding to terminal with color formatting.
    pub fn print_terminal(&self) {
        print!(
            "    {} {} [{}] {}",
            format!("{}:{}", self.path, self.line).blue(),
            self.severity.colored_label(),
            self.detector_id.yellow(),
            self.matched_text.trim().white()
        );
        if self.is_structural() {
            let lines: Vec<String> = self.related_lines.iter().map(|l| l.to_string()).collect();
            print!(" {}", format!("(evidence at line {})", lines.join(", ")).dimmed());
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        Finding {
            detector_id: "d".to_string(),
            severity,
            path: "a.py".to_string(),
            line: 1,
            matched_text: "x".to_string(),
            related_lines: Vec::new(),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Important);
        assert!(Severity::Important > Severity::Deprecated);
        assert!(Tier::Deprecated > Tier::Clean);
    }

    #[test]
    fn test_tier_is_max_severity() {
        assert_eq!(Tier::of(&Vec::<Finding>::new()), Tier::Clean);
        let findings = vec![finding(Severity::Deprecated), finding(Severity::Important)];
        assert_eq!(Tier::of(&findings), Tier::Important);
    }
}
