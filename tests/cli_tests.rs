use assert_cmd::Command;
use predicates::prelude::*;

fn sentinel() -> Command {
    Command::cargo_bin("upgrade-sentinel").unwrap()
}

#[test]
fn test_scan_fixture_project_fails_ci() {
    sentinel()
        .args(["scan", "tests/fixtures/django_project", "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("migration-pytz-in-data-function"))
        .stdout(predicate::str::contains("mitigate-or-isolate"))
        .stdout(predicate::str::contains("pytz_shim").not());
}

#[test]
fn test_scan_clean_tree_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), "from zoneinfo import ZoneInfo\n").unwrap();

    sentinel()
        .arg("scan")
        .arg(dir.path())
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no-action-required"));
}

#[test]
fn test_scan_writes_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    sentinel()
        .args(["scan", "tests/fixtures/django_project", "--format", "markdown"])
        .arg("--output")
        .arg(&out)
        .assert()
        .code(1);

    let markdown = std::fs::read_to_string(out.join("upgrade_report.md")).unwrap();
    assert!(markdown.contains("shop/migrations/0002_populate_timezones.py"));
}

#[test]
fn test_github_annotations_honor_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    sentinel()
        .args(["scan", "tests/fixtures/django_project", "--format", "github"])
        .arg("--output")
        .arg(&out)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("::error").not());

    let annotations = std::fs::read_to_string(out.join("upgrade_report.txt")).unwrap();
    assert!(annotations.contains(
        "::error file=shop/migrations/0002_populate_timezones.py,line=5,title=migration-pytz-in-data-function::"
    ));
}

#[test]
fn test_only_filter_limits_detectors() {
    sentinel()
        .args([
            "scan",
            "tests/fixtures/django_project",
            "--format",
            "json",
            "--only",
            "uuid-field",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("uuid-field"))
        .stdout(predicate::str::contains("pytz-import").not());
}

#[test]
fn test_unknown_detector_id_is_rejected() {
    sentinel()
        .args(["scan", "tests/fixtures/django_project", "--only", "no-such-detector"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-detector"));
}

#[test]
fn test_validate_rejects_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("detectors.yaml");
    std::fs::write(
        &file,
        r#"
detectors:
  - id: broken
    category: structural
    severity: critical
    anchor: missing-anchor
    evidence: missing-evidence
"#,
    )
    .unwrap();

    sentinel()
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing-anchor"));
}

#[test]
fn test_validate_accepts_detector_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("detectors.yaml");
    std::fs::write(
        &file,
        "detectors:\n  - id: pytz\n    severity: important\n    pattern: 'pytz'\n",
    )
    .unwrap();

    sentinel()
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 detectors"));
}

#[test]
fn test_list_shows_builtin_detectors() {
    sentinel()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("migration-pytz-in-data-function"));
}

#[test]
fn test_version() {
    sentinel()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
