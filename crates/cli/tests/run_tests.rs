// End-to-end tests for `hbpanel run` and `hbpanel validate`.
// Run with: cargo test -p hillburton-cli --test run_tests
//
// Each test copies the three-state fixtures into a temp dir, optionally
// breaks one input, and checks exit code, stdout and the artifacts on disk.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn hbpanel() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hbpanel"))
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../panel/tests/fixtures")
}

/// Temp workspace holding copies of the fixtures.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["income.csv", "population.csv", "projects.tsv", "three-states.toml"] {
        std::fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn rewrite(dir: &TempDir, name: &str, f: impl FnOnce(String) -> String) {
    let path = dir.path().join(name);
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, f(text)).unwrap();
}

fn run_panel(dir: &TempDir, extra: &[&str]) -> Output {
    hbpanel()
        .arg("run")
        .arg("--config")
        .arg(dir.path().join("three-states.toml"))
        .arg("--out-dir")
        .arg(dir.path().join("out"))
        .args(extra)
        .output()
        .unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_no_artifacts(dir: &TempDir) {
    assert!(!dir.path().join("out").exists(), "artifacts written on failure");
}

// ============================================================================
// Success
// ============================================================================

#[test]
fn run_writes_three_artifacts() {
    let dir = workspace();
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty(), "stdout should be empty without --json");

    let out = dir.path().join("out");
    let csv = std::fs::read_to_string(out.join("panel.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("state,code,year,state_year,predicted,actual,allotment_pct")
    );
    assert_eq!(lines.count(), 9);
    assert!(csv.contains("Alabama 1948"));

    let svg = std::fs::read_to_string(out.join("actual_vs_predicted.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<circle").count(), 9);

    let report = std::fs::read_to_string(out.join("report.txt")).unwrap();
    assert!(report.contains("Three-state fixture"));

    let err = stderr(&output);
    assert!(err.contains("9 rows"), "stderr: {err}");
    assert!(err.contains("sha256"), "stderr: {err}");
}

#[test]
fn run_json_summary() {
    let dir = workspace();
    let output = run_panel(&dir, &["--json"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["rows"], 9);
    assert_eq!(summary["rows_per_year"]["1947"], 3);
    assert_eq!(summary["rows_per_year"]["1949"], 3);
    assert_eq!(summary["fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(summary["artifacts"].as_array().unwrap().len(), 3);
    assert_eq!(summary["stats"]["register"]["absent_amount"], 1);
    assert!(summary["report"]["correlation"].is_number());
}

#[test]
fn rerun_has_same_fingerprint() {
    let dir = workspace();
    let first = run_panel(&dir, &["--json"]);
    let second = run_panel(&dir, &["--json"]);
    let a: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    let b: serde_json::Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(a["fingerprint"], b["fingerprint"]);
}

#[test]
fn output_dir_from_config_is_relative_to_config() {
    let dir = workspace();
    rewrite(&dir, "three-states.toml", |t| format!("{t}\n[output]\ndir = \"build\"\n"));
    let output = hbpanel()
        .arg("run")
        .arg("--config")
        .arg(dir.path().join("three-states.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(dir.path().join("build/panel.csv").exists());
}

// ============================================================================
// Integrity failures
// ============================================================================

#[test]
fn missing_identity_column_exits_10() {
    let dir = workspace();
    rewrite(&dir, "income.csv", |t| t.replacen("state,fips", "name,fips", 1));
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("income"));
    assert_no_artifacts(&dir);
}

#[test]
fn state_missing_from_population_exits_11() {
    let dir = workspace();
    rewrite(&dir, "population.csv", |t| {
        t.lines()
            .filter(|l| !l.starts_with("Arizona,"))
            .map(|l| format!("{l}\n"))
            .collect()
    });
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(11));
    let err = stderr(&output);
    assert!(err.contains("income only"), "stderr: {err}");
    assert!(err.contains("Arizona"), "stderr: {err}");
    assert_no_artifacts(&dir);
}

#[test]
fn wrong_expected_count_exits_12() {
    let dir = workspace();
    rewrite(&dir, "three-states.toml", |t| t.replace("expected = 3", "expected = 4"));
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(12));
    assert!(stderr(&output).contains("panel rows: 9 (expected 12, 4 per year)"));
    assert_no_artifacts(&dir);
}

#[test]
fn json_error_on_stderr() {
    let dir = workspace();
    rewrite(&dir, "three-states.toml", |t| t.replace("expected = 3", "expected = 4"));
    let output = run_panel(&dir, &["--json"]);
    assert_eq!(output.status.code(), Some(12));
    assert!(output.stdout.is_empty());

    let err = stderr(&output);
    let line = err
        .lines()
        .find(|l| l.starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON error line in: {err}"));
    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(value["error"], "balance_violation");
    assert_eq!(value["exit_code"], 12);
    assert_eq!(value["details"]["expected_rows"], 12);
}

// ============================================================================
// Config and IO
// ============================================================================

#[test]
fn invalid_config_exits_4() {
    let dir = workspace();
    rewrite(&dir, "three-states.toml", |t| t.replace("last = 1949", "last = 1940"));
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(4));
    assert_no_artifacts(&dir);
}

#[test]
fn missing_input_exits_3() {
    let dir = workspace();
    std::fs::remove_file(dir.path().join("projects.tsv")).unwrap();
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("projects.tsv"));
    assert_no_artifacts(&dir);
}

fn out_entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn failed_plot_write_leaves_no_panel() {
    let dir = workspace();
    rewrite(&dir, "three-states.toml", |t| {
        format!("{t}\n[output]\nplot = \"missing/plot.svg\"\n")
    });
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("plot.svg"));
    assert!(out_entries(&dir).is_empty(), "left behind: {:?}", out_entries(&dir));
}

#[test]
fn failed_report_rename_removes_earlier_artifacts() {
    let dir = workspace();
    // A directory where the report should go makes the final rename fail
    std::fs::create_dir_all(dir.path().join("out/report.txt")).unwrap();
    let output = run_panel(&dir, &[]);
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(out_entries(&dir), vec!["report.txt".to_string()]);
}

#[test]
fn validate_accepts_fixture_config() {
    let dir = workspace();
    let output = hbpanel()
        .arg("validate")
        .arg(dir.path().join("three-states.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("9 panel row(s)"), "stderr: {err}");
    assert!(!err.contains("warning"), "stderr: {err}");
}

#[test]
fn validate_rejects_unknown_year_source() {
    let dir = workspace();
    rewrite(&dir, "three-states.toml", |t| t.replace("label_row", "footnote"));
    let output = hbpanel()
        .arg("validate")
        .arg(dir.path().join("three-states.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}
