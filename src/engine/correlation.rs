//! # Correlation Resolver
//!
//! @title Structural Detector Resolution
//! @author Ramprasad
//!
//! Layers structural findings on top of the simple findings of one unit.
//!
//! ## Resolution
//!
//! For every structural detector that applies to the unit, each distinct
//! anchor occurrence is checked independently:
//!
//! - `scope: file` - fires if the evidence detector matched anywhere in the unit.
//! - `scope: region` - fires if an evidence line falls inside the anchor's
//!   [`Region`]. An ambiguous region falls back to file scope for that anchor.
//!
//! Each firing yields one finding at the anchor, so a helper called many
//! times inside one function is counted once.

use super::region::{extract_region, Region};
use crate::detectors::{DetectorRegistry, Scope};
use crate::report::Finding;
use crate::source::SourceUnit;
use std::collections::{BTreeMap, BTreeSet};

/// Resolves all structural detectors against one unit's simple findings.
///
/// Returns only the synthesized structural findings; the simple findings are
/// left untouched.
pub fn resolve(unit: &SourceUnit, findings: &[Finding], registry: &DetectorRegistry) -> Vec<Finding> {
    let mut structural = Vec::new();

    for detector in registry.structural_detectors() {
        let Some(correlation) = detector.correlation() else {
            continue;
        };
        if !detector.applies_to(&unit.path) {
            continue;
        }

        // First match per line: one definition line is one anchor.
        let mut anchors: BTreeMap<usize, &str> = BTreeMap::new();
        for f in findings.iter().filter(|f| f.detector_id == correlation.anchor) {
            anchors.entry(f.line).or_insert(f.matched_text.as_str());
        }

        let evidence: BTreeSet<usize> = findings
            .iter()
            .filter(|f| f.detector_id == correlation.evidence)
            .map(|f| f.line)
            .collect();

        if anchors.is_empty() || evidence.is_empty() {
            continue;
        }

        for (&line, &matched_text) in &anchors {
            let related_lines: Vec<usize> = match correlation.scope {
                Scope::File => evidence.iter().copied().collect(),
                Scope::Region => match extract_region(unit, line, &correlation.boundary) {
                    region @ Region::Bounded { .. } => {
                        evidence.iter().copied().filter(|l| region.contains(*l)).collect()
                    }
                    Region::Ambiguous => {
                        log::warn!(
                            "{}:{}: region of '{}' anchor cannot be bounded, using file scope",
                            unit.path,
                            line,
                            detector.id()
                        );
                        evidence.iter().copied().collect()
                    }
                },
            };

            if related_lines.is_empty() {
                continue;
            }

            log::debug!(
                "{}:{}: {} correlated with evidence at {:?}",
                unit.path,
                line,
                detector.id(),
                related_lines
            );

            structural.push(Finding {
                detector_id: detector.id().to_string(),
                severity: detector.severity(),
                path: unit.path.clone(),
                line,
                matched_text: matched_text.to_string(),
                related_lines,
            });
        }
    }

    structural
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::DetectorDef;
    use crate::engine::scan_unit;
    use crate::report::Severity;

    fn registry(scope: Scope) -> DetectorRegistry {
        DetectorRegistry::load(&[
            DetectorDef::simple("import", Severity::Important, r"^import pytz"),
            DetectorDef::simple("data-fn", Severity::Deprecated, r"^\s*def \w+\(apps, schema_editor\)"),
            DetectorDef::simple("call", Severity::Important, r"pytz\.\w+"),
            DetectorDef::structural("in-fn", Severity::Critical, "data-fn", "call", scope),
        ])
        .unwrap()
    }

    fn resolve_source(source: &str, scope: Scope) -> Vec<Finding> {
        let registry = registry(scope);
        let unit = SourceUnit::new("app/migrations/0002_data.py", source);
        let simple = scan_unit(&unit, &registry);
        resolve(&unit, &simple, &registry)
    }

    const FORWARDS_CALLS_PYTZ: &str = "import pytz\n\
        def forwards(apps, schema_editor):\n\
        \x20   tz = pytz.timezone('UTC')\n\
        \n\
        def backwards(apps, schema_editor):\n\
        \x20   pass\n";

    #[test]
    fn test_region_scope_correlates_only_enclosing_anchor() {
        let found = resolve_source(FORWARDS_CALLS_PYTZ, Scope::Region);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].detector_id, "in-fn");
        assert_eq!(found[0].line, 2);
        assert_eq!(found[0].related_lines, vec![3]);
        assert_eq!(found[0].severity, Severity::Critical);
    }

    #[test]
    fn test_call_outside_any_region_does_not_correlate() {
        let source = "import pytz\n\
            UTC = pytz.utc\n\
            def forwards(apps, schema_editor):\n\
            \x20   pass\n";
        assert!(resolve_source(source, Scope::Region).is_empty());
    }

    #[test]
    fn test_file_scope_fires_for_every_anchor() {
        let found = resolve_source(FORWARDS_CALLS_PYTZ, Scope::File);
        let lines: Vec<usize> = found.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![2, 5]);
        assert!(found.iter().all(|f| f.related_lines == vec![3]));
    }

    #[test]
    fn test_many_evidence_lines_count_one_anchor() {
        let source = "def forwards(apps, schema_editor):\n\
            \x20   a = pytz.utc\n\
            \x20   b = pytz.timezone('UTC')\n\
            \x20   c = pytz.UTC\n";
        let found = resolve_source(source, Scope::Region);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].related_lines, vec![2, 3, 4]);
    }

    #[test]
    fn test_ambiguous_region_falls_back_to_file_scope() {
        let source = "x = pytz.utc\n\
            def forwards(apps, schema_editor):\n";
        let found = resolve_source(source, Scope::Region);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].related_lines, vec![1]);
    }

    #[test]
    fn test_call_shaped_anchor_in_list_stays_bounded() {
        let registry = DetectorRegistry::load(&[
            DetectorDef::simple("runpython", Severity::Deprecated, r"RunPython\("),
            DetectorDef::simple("call", Severity::Important, r"pytz\.\w+"),
            DetectorDef::structural("s", Severity::Critical, "runpython", "call", Scope::Region),
        ])
        .unwrap();
        let unit = SourceUnit::new(
            "app/migrations/0002_data.py",
            "class Migration(migrations.Migration):\n\
             \x20   operations = [\n\
             \x20       migrations.RunPython(forwards, backwards),\n\
             \x20   ]\n\
             \n\
             \n\
             def helper():\n\
             \x20   return pytz.utc\n",
        );
        let simple = scan_unit(&unit, &registry);
        assert!(resolve(&unit, &simple, &registry).is_empty());
    }

    #[test]
    fn test_no_evidence_means_no_structural_finding() {
        let source = "def forwards(apps, schema_editor):\n    pass\n";
        assert!(resolve_source(source, Scope::Region).is_empty());
        assert!(resolve_source(source, Scope::File).is_empty());
    }
}
