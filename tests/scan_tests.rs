//! Library-level scan tests over in-memory units and the fixture project.

use std::path::PathBuf;
use upgrade_sentinel::detectors::{DetectorDef, Scope};
use upgrade_sentinel::report::RecommendationPolicy;
use upgrade_sentinel::source::{FsProvider, MemoryProvider};
use upgrade_sentinel::{DetectorRegistry, ScanReport, Scanner, Severity, Tier};

const MIGRATION: &str = "app/migrations/0002_data.py";

const PYTZ_IN_FORWARDS: &str = "import pytz
def forwards(apps, schema_editor):
    tz = pytz.timezone('UTC')

def backwards(apps, schema_editor):
    pass
";

const PYTZ_OUTSIDE_FUNCTIONS: &str = "import pytz
UTC = pytz.utc
def forwards(apps, schema_editor):
    pass

def backwards(apps, schema_editor):
    pass
";

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/django_project")
}

fn scan(provider: &MemoryProvider) -> ScanReport {
    let registry = DetectorRegistry::builtin().unwrap();
    Scanner::new(&registry).scan(provider)
}

fn tier_of(report: &ScanReport, path: &str) -> Tier {
    report
        .file_profiles
        .iter()
        .find(|p| p.path == path)
        .map(|p| p.tier)
        .unwrap_or(Tier::Clean)
}

#[test]
fn pytz_call_inside_data_function_is_structural_critical() {
    let report = scan(&MemoryProvider::new().with(MIGRATION, PYTZ_IN_FORWARDS));

    let profile = &report.file_profiles[0];
    assert_eq!(profile.tier, Tier::Critical);
    assert!(profile.structural_critical);

    let structural: Vec<_> = profile
        .findings
        .iter()
        .filter(|f| f.detector_id == "migration-pytz-in-data-function")
        .collect();
    assert_eq!(structural.len(), 1, "only the enclosing anchor correlates");
    assert_eq!(structural[0].line, 2);
    assert_eq!(structural[0].related_lines, vec![3]);

    // The underlying simple findings are still reported.
    assert!(profile
        .findings
        .iter()
        .any(|f| f.detector_id == "migration-pytz-call" && f.line == 3));
    assert_eq!(report.recommendation, "mitigate-or-isolate");
}

#[test]
fn pytz_outside_every_region_is_at_most_important() {
    let report = scan(&MemoryProvider::new().with(MIGRATION, PYTZ_OUTSIDE_FUNCTIONS));
    let tier = tier_of(&report, MIGRATION);
    assert!(tier <= Tier::Important, "got {:?}", tier);
    assert_eq!(report.structural_critical_files, 0);
    assert_eq!(report.recommendation, "no-action-required");
}

#[test]
fn two_structural_files_and_five_important_files_mitigate() {
    let mut provider = MemoryProvider::new();
    for i in 0..2 {
        provider = provider.with(format!("app{}/migrations/0002_data.py", i), PYTZ_IN_FORWARDS);
    }
    for i in 0..5 {
        provider = provider.with(
            format!("app{}/models.py", i),
            "id = models.UUIDField(primary_key=True)\n",
        );
    }

    let report = scan(&provider);
    assert_eq!(report.structural_critical_files, 2);
    assert_eq!(report.counts_by_tier[&Tier::Critical], 2);
    assert_eq!(report.counts_by_tier[&Tier::Important], 5);
    assert_eq!(report.recommendation, "mitigate-or-isolate");
}

#[test]
fn four_structural_files_retain_dependency() {
    let provider: MemoryProvider = (0..4)
        .map(|i| (format!("app{}/migrations/0002_data.py", i), PYTZ_IN_FORWARDS))
        .collect();
    assert_eq!(scan(&provider).recommendation, "retain-dependency");
}

#[test]
fn custom_policy_overrides_breakpoints() {
    let registry = DetectorRegistry::builtin().unwrap();
    let policy = RecommendationPolicy::new(vec![
        upgrade_sentinel::report::ThresholdRule::new(0, "ship-it"),
        upgrade_sentinel::report::ThresholdRule::new(1, "stop"),
    ])
    .unwrap();
    let provider = MemoryProvider::new().with(MIGRATION, PYTZ_IN_FORWARDS);
    let report = Scanner::new(&registry).with_policy(policy).scan(&provider);
    assert_eq!(report.recommendation, "stop");
}

#[test]
fn clean_files_are_counted_but_omitted() {
    let provider = MemoryProvider::new()
        .with("app/utils.py", "from zoneinfo import ZoneInfo\n")
        .with("app/views.py", "import pytz\n");
    let report = scan(&provider);

    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.file_profiles.len(), 1);
    assert_eq!(report.file_profiles[0].path, "app/views.py");
    assert_eq!(report.counts_by_tier[&Tier::Clean], 1);

    let registry = DetectorRegistry::builtin().unwrap();
    let full = Scanner::new(&registry).with_full_coverage(true).scan(&provider);
    assert_eq!(full.file_profiles.len(), 2);
    assert_eq!(tier_of(&full, "app/utils.py"), Tier::Clean);
}

#[test]
fn scanning_twice_is_byte_identical() {
    let provider = MemoryProvider::new()
        .with(MIGRATION, PYTZ_IN_FORWARDS)
        .with("app/views.py", "import pytz\nx = make_aware(dt, is_dst=True)\n");
    let first = scan(&provider).to_json().unwrap();
    let second = scan(&provider).to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn delivery_order_does_not_change_the_report() {
    let entries = vec![
        ("z/views.py", "import pytz\n"),
        (MIGRATION, PYTZ_IN_FORWARDS),
        ("a/models.py", "uid = models.UUIDField()\n"),
        ("m/form.html", "{{ form.as_table }}\n"),
        ("b/utils.py", "x = 1\n"),
    ];
    let forward: MemoryProvider = entries.iter().cloned().collect();
    let backward: MemoryProvider = entries.iter().rev().cloned().collect();

    let a = scan(&forward);
    let b = scan(&backward);
    assert_eq!(a, b);
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());

    let paths: Vec<&str> = a.file_profiles.iter().map(|p| p.path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn adding_a_matching_line_never_lowers_the_tier() {
    let base = "uid = models.UUIDField()\n";
    let before = scan(&MemoryProvider::new().with("app/models.py", base));
    let after = scan(&MemoryProvider::new().with(
        "app/models.py",
        format!("{}from django.utils import datetime_safe\n", base),
    ));
    assert!(tier_of(&after, "app/models.py") >= tier_of(&before, "app/models.py"));
    assert_eq!(tier_of(&after, "app/models.py"), Tier::Critical);
}

#[test]
fn detector_without_matches_never_appears() {
    let registry = DetectorRegistry::load(&[
        DetectorDef::simple("hit", Severity::Important, "pytz"),
        DetectorDef::simple("ghost-detector", Severity::Critical, "no_such_call"),
        DetectorDef::simple("anchor", Severity::Deprecated, "def "),
        DetectorDef::structural("ghost-structural", Severity::Critical, "anchor", "ghost-detector", Scope::File),
    ])
    .unwrap();
    let provider = MemoryProvider::new().with("a.py", "def f():\n    pytz.utc\n");
    let report = Scanner::new(&registry).scan(&provider);

    let json = report.to_json().unwrap();
    assert!(json.contains("\"hit\""));
    assert!(!json.contains("ghost"));
    assert!(!report.to_nested_yaml().unwrap().contains("ghost"));
}

#[test]
fn fixture_project_scan() {
    let registry = DetectorRegistry::builtin().unwrap();
    let report = Scanner::new(&registry).scan(&FsProvider::new(fixture_root()));

    assert!(report.complete);
    assert!(report.skipped.is_empty());
    assert_eq!(report.files_scanned, 8, ".venv must be skipped");
    assert_eq!(report.files_with_findings(), 6);
    assert_eq!(report.structural_critical_files, 1);
    assert_eq!(report.recommendation, "mitigate-or-isolate");
    assert!(report.gates_ci());

    assert_eq!(tier_of(&report, "shop/migrations/0002_populate_timezones.py"), Tier::Critical);
    assert_eq!(tier_of(&report, "shop/migrations/0003_default_zone.py"), Tier::Important);
    assert_eq!(tier_of(&report, "shop/views.py"), Tier::Critical);
    assert_eq!(tier_of(&report, "shop/models.py"), Tier::Important);
    assert_eq!(tier_of(&report, "shop/templates/store_form.html"), Tier::Important);
    assert_eq!(tier_of(&report, "project/settings.py"), Tier::Critical);
    assert_eq!(tier_of(&report, "shop/utils.py"), Tier::Clean);

    let views = report
        .file_profiles
        .iter()
        .find(|p| p.path == "shop/views.py")
        .unwrap();
    assert!(!views.structural_critical);
    // The aggregate import line is excluded; only the call is reported.
    let aggregates: Vec<usize> = views
        .findings
        .iter()
        .filter(|f| f.detector_id == "postgres-aggregate")
        .map(|f| f.line)
        .collect();
    assert_eq!(aggregates, vec![9]);
}

#[test]
fn unreadable_file_is_skipped_not_clean() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ok.py"), "import pytz\n").unwrap();
    std::fs::write(dir.path().join("latin1.py"), [b'#', 0xe9, b'\n']).unwrap();

    let registry = DetectorRegistry::builtin().unwrap();
    let report = Scanner::new(&registry)
        .with_full_coverage(true)
        .scan(&FsProvider::new(dir.path()));

    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, "latin1.py");
    assert!(report.file_profiles.iter().all(|p| p.path != "latin1.py"));
    assert_eq!(report.to_structured().summary.skipped.len(), 1);
}
