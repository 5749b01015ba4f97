//! Integration tests for the MQT CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to get an mqt command
fn mqt() -> Command {
    Command::cargo_bin("mqt").unwrap()
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    mqt().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Extract an entity ID with the given prefix from command output
fn extract_id(output: &std::process::Output, prefix: &str) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|l| l.contains(&format!("{prefix}-")))
        .and_then(|l| {
            l.split_whitespace()
                .find(|w| w.starts_with(&format!("{prefix}-")))
        })
        .map(|s| s.trim_end_matches("...").to_string())
        .unwrap_or_default()
}

/// Helper to create a test NCR, returning its ID
fn create_test_ncr(tmp: &TempDir, severity: &str) -> String {
    let output = mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "new",
            "--title",
            "Bore oversize",
            "--severity",
            severity,
            "--description",
            "bore measured above limit",
            "--item",
            "lot:2026-0142:50",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    extract_id(&output, "NCR")
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    mqt()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("statistical quality control"));
}

#[test]
fn test_version_displays() {
    mqt()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mqt"));
}

#[test]
fn test_init_creates_project_dirs() {
    let tmp = setup_test_project();
    assert!(tmp.path().join(".mqt/config.yaml").exists());
    assert!(tmp.path().join("quality/ncrs").is_dir());
    assert!(tmp.path().join("quality/charts").is_dir());
    assert!(tmp.path().join("quality/regimes").is_dir());
}

#[test]
fn test_command_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an MQT project"));
}

// ============================================================================
// Sampling Tests
// ============================================================================

#[test]
fn test_sample_resolve_reference_values() {
    mqt()
        .args([
            "sample", "resolve", "--level", "II", "--aql", "1.0", "--lot-size", "500",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("code H"))
        .stdout(predicate::str::contains("sample size 50"));
}

#[test]
fn test_sample_resolve_rejects_nonstandard_aql() {
    mqt()
        .args([
            "sample", "resolve", "--level", "II", "--aql", "1.1", "--lot-size", "500",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a standard table step"));
}

#[test]
fn test_sample_evaluate_accepts_clean_lot() {
    let tmp = setup_test_project();
    mqt()
        .current_dir(tmp.path())
        .args([
            "sample", "evaluate", "--level", "II", "--aql", "1.0", "--lot-size", "500",
            "--defects", "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACCEPT"));
}

#[test]
fn test_sample_evaluate_reject_opens_ncr() {
    let tmp = setup_test_project();
    mqt()
        .current_dir(tmp.path())
        .args([
            "sample", "evaluate", "--level", "II", "--aql", "1.0", "--lot-size", "500",
            "--defects", "2", "--lot", "2026-0142",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("REJECT"))
        .stdout(predicate::str::contains("Opened NCR-"));

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1"));
}

#[test]
fn test_sample_evaluate_critical_reject_quarantines() {
    let tmp = setup_test_project();
    let output = mqt()
        .current_dir(tmp.path())
        .args([
            "sample", "evaluate", "--level", "II", "--aql", "1.0", "--lot-size", "500",
            "--defects", "3", "--lot", "2026-0143", "--severity", "critical",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Auto-quarantine"));

    let ncr_id = extract_id(&output, "NCR");
    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "show", ncr_id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("implemented_by: system"))
        .stdout(predicate::str::contains("quarantined: true"));
}

// ============================================================================
// Control Chart Tests
// ============================================================================

fn create_test_chart(tmp: &TempDir) -> String {
    let output = mqt()
        .current_dir(tmp.path())
        .args([
            "chart", "new", "--title", "Bore diameter", "--characteristic",
            "bore-diameter", "--type", "xbar_r", "--usl", "10.5", "--lsl", "9.5",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    extract_id(&output, "CHART")
}

#[test]
fn test_chart_limits_need_two_subgroups() {
    let tmp = setup_test_project();
    let id = create_test_chart(&tmp);

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "add", id.as_str(), "10.0", "10.1", "9.9"])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "limits", id.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 2 subgroups"));
}

#[test]
fn test_chart_limits_and_capability() {
    let tmp = setup_test_project();
    let id = create_test_chart(&tmp);

    for _ in 0..3 {
        mqt()
            .current_dir(tmp.path())
            .args(["chart", "add", id.as_str(), "10.0", "10.1", "9.9"])
            .assert()
            .success();
        mqt()
            .current_dir(tmp.path())
            .args(["chart", "add", id.as_str(), "9.9", "10.0", "10.2"])
            .assert()
            .success();
    }

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "limits", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("UCL"));

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "capability", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cpk"));
}

#[test]
fn test_chart_rejects_mismatched_subgroup() {
    let tmp = setup_test_project();
    let id = create_test_chart(&tmp);

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "add", id.as_str(), "10.0", "10.1", "9.9"])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "add", id.as_str(), "10.0", "10.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));
}

#[test]
fn test_chart_violations_detects_outlier() {
    let tmp = setup_test_project();
    let id = create_test_chart(&tmp);

    let rows = [
        ["10.0", "10.1", "9.9"],
        ["9.9", "10.0", "10.1"],
        ["10.1", "10.0", "9.9"],
        ["10.0", "9.9", "10.1"],
        ["14.0", "14.2", "13.8"],
    ];
    for row in rows {
        let mut args = vec!["chart", "add", id.as_str()];
        args.extend(row);
        mqt().current_dir(tmp.path()).args(args).assert().success();
    }

    mqt()
        .current_dir(tmp.path())
        .args(["chart", "violations", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("beyond_limits"));
}

#[test]
fn test_chart_import_csv() {
    let tmp = setup_test_project();
    let id = create_test_chart(&tmp);

    let csv_path = tmp.path().join("subgroups.csv");
    std::fs::write(&csv_path, "10.0,10.1,9.9\n9.9,10.0,10.1\n10.1,9.9,10.0\n").unwrap();

    mqt()
        .current_dir(tmp.path())
        .args([
            "chart",
            "import",
            id.as_str(),
            "--file",
            csv_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3/3"));
}

// ============================================================================
// NCR Workflow Tests
// ============================================================================

#[test]
fn test_ncr_full_lifecycle() {
    let tmp = setup_test_project();
    let id = create_test_ncr(&tmp, "major");

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "review", id.as_str(), "--reviewer", "qe-lead"])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "disposition",
            id.as_str(),
            "--decision",
            "scrap",
            "--justification",
            "not reworkable",
            "--approver",
            "qe-lead",
        ])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "close", id.as_str()])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "show", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("status: closed"));
}

#[test]
fn test_ncr_cannot_skip_review() {
    let tmp = setup_test_project();
    let id = create_test_ncr(&tmp, "major");

    mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "disposition",
            id.as_str(),
            "--decision",
            "scrap",
            "--justification",
            "x",
            "--approver",
            "y",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid status transition"));
}

#[test]
fn test_ncr_rework_requires_reinspection_flag() {
    let tmp = setup_test_project();
    let id = create_test_ncr(&tmp, "major");

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "review", id.as_str(), "--reviewer", "qe-lead"])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "disposition",
            id.as_str(),
            "--decision",
            "rework",
            "--justification",
            "re-machinable",
            "--approver",
            "qe-lead",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reinspection"));

    mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "disposition",
            id.as_str(),
            "--decision",
            "rework",
            "--justification",
            "re-machinable",
            "--approver",
            "qe-lead",
            "--reinspection",
        ])
        .assert()
        .success();
}

#[test]
fn test_ncr_close_gated_by_capa() {
    let tmp = setup_test_project();
    let id = create_test_ncr(&tmp, "major");

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "review", id.as_str(), "--reviewer", "qe-lead"])
        .assert()
        .success();
    mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "disposition",
            id.as_str(),
            "--decision",
            "scrap",
            "--justification",
            "not reworkable",
            "--approver",
            "qe-lead",
        ])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args([
            "ncr",
            "link-capa",
            id.as_str(),
            "CAPA-01HQ3K4N5M6P7R8S9T0VWXYZAB",
        ])
        .assert()
        .success();

    // Unverified corrective action blocks closure.
    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "close", id.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not verified effective"));

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "close", id.as_str(), "--capa-effective"])
        .assert()
        .success();
}

#[test]
fn test_ncr_critical_quarantines_on_manual_create() {
    let tmp = setup_test_project();
    let id = create_test_ncr(&tmp, "critical");

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "show", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("auto-quarantine"))
        .stdout(predicate::str::contains("implemented_by: system"));
}

#[test]
fn test_ncr_cancel_before_disposition_only() {
    let tmp = setup_test_project();
    let id = create_test_ncr(&tmp, "minor");

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "cancel", id.as_str(), "--reason", "duplicate"])
        .assert()
        .success();

    mqt()
        .current_dir(tmp.path())
        .args(["ncr", "review", id.as_str(), "--reviewer", "qe-lead"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid status transition"));
}

// ============================================================================
// Plan Tests
// ============================================================================

#[test]
fn test_plan_new_and_evaluate() {
    let tmp = setup_test_project();
    let output = mqt()
        .current_dir(tmp.path())
        .args([
            "plan", "new", "--title", "Incoming bore inspection", "--product",
            "widget-7", "--characteristic", "bore-diameter", "--level", "II",
            "--aql", "1.0", "--usl", "10.5", "--lsl", "9.5", "--switching",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan_id = extract_id(&output, "PLAN");

    mqt()
        .current_dir(tmp.path())
        .args([
            "sample", "evaluate", "--plan", plan_id.as_str(), "--lot-size", "500",
            "--defects", "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACCEPT"));
}

#[test]
fn test_switching_to_tightened_after_consecutive_rejects() {
    let tmp = setup_test_project();
    let output = mqt()
        .current_dir(tmp.path())
        .args([
            "plan", "new", "--title", "Incoming bore inspection", "--product",
            "widget-7", "--characteristic", "bore-diameter", "--level", "II",
            "--aql", "1.0", "--switching",
        ])
        .output()
        .unwrap();
    let plan_id = extract_id(&output, "PLAN");

    mqt()
        .current_dir(tmp.path())
        .args([
            "sample", "evaluate", "--plan", plan_id.as_str(), "--lot-size", "500",
            "--defects", "2", "--no-ncr",
        ])
        .assert()
        .success();

    // Second consecutive rejection moves the regime to tightened.
    mqt()
        .current_dir(tmp.path())
        .args([
            "sample", "evaluate", "--plan", plan_id.as_str(), "--lot-size", "500",
            "--defects", "2", "--no-ncr",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("normal → tightened"));
}
