use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_plan(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

fn jobtrack() -> Command {
    let mut cmd = Command::cargo_bin("jobtrack").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

const TOLERANT_PLAN: &str = r#"
name: nightly values
jobType: DATA_VALUE_IMPORT
stages:
  - description: validate
    faultTolerance: SKIP_ITEM
    items: [a, b, c]
    fail: [a, b, c]
  - description: persist
    items: [a, b]
"#;

#[test]
fn test_validate_command() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(&tmp_dir, "plan.yaml", TOLERANT_PLAN);

    let assert = jobtrack()
        .args(["validate", plan.to_str().unwrap()])
        .assert()
        .success();
    assert!(stdout_of(&assert).contains("ok: valid job plan `nightly values`"));
}

#[test]
fn test_validate_invalid_plan() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(
        &tmp_dir,
        "invalid.yaml",
        "name: x\njobType: PREDICTOR\nstages:\n  - description: s\n    items: [a]\n    fail: [b]\n",
    );

    jobtrack()
        .args(["validate", plan.to_str().unwrap()])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_validate_unparseable_plan() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(&tmp_dir, "broken.yaml", "invalid: yaml: content");

    jobtrack()
        .args(["validate", plan.to_str().unwrap()])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_validate_missing_file() {
    jobtrack()
        .args(["validate", "/definitely/not/here.yaml"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn test_run_tolerant_plan_completes() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(&tmp_dir, "plan.yaml", TOLERANT_PLAN);

    let assert = jobtrack()
        .args(["run", plan.to_str().unwrap(), "--format", "json"])
        .assert()
        .success();

    let stdout = stdout_of(&assert);
    let result: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let execution = &result["execution"];
    assert_eq!(execution["status"], "COMPLETED");
    let stages = execution["process"]["stages"].as_array().unwrap();
    assert_eq!(stages[0]["status"], "COMPLETED");
    assert_eq!(stages[0]["failures"], 3);
    assert_eq!(stages[0]["message"], "0 succeeded, 3 failed");
    assert_eq!(stages[1]["successes"], 2);
    assert_eq!(result["metrics"]["processes"]["completed"], 1);
}

#[test]
fn test_run_fail_fast_plan_fails() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(
        &tmp_dir,
        "plan.json",
        r#"{
  "name": "strict",
  "jobType": "METADATA_IMPORT",
  "stages": [
    {"description": "objects", "items": ["1", "2", "3"], "fail": ["1"]},
    {"description": "never"}
  ]
}"#,
    );

    let assert = jobtrack()
        .args(["run", plan.to_str().unwrap(), "--format", "json"])
        .assert()
        .failure()
        .code(3);

    let stdout = stdout_of(&assert);
    let result: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let stages = result["execution"]["process"]["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0]["items"].as_array().unwrap().len(), 1);
}

#[test]
fn test_run_timeout_cancels() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(
        &tmp_dir,
        "slow.yaml",
        r#"
name: slow
jobType: PREDICTOR
stages:
  - description: crawl
    faultTolerance: SKIP_ITEM
    delayMs: 50
    items: [a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p]
"#,
    );

    jobtrack()
        .args(["run", plan.to_str().unwrap(), "--timeout-ms", "100", "--quiet"])
        .assert()
        .failure()
        .code(5);
}

#[test]
fn test_run_text_output_with_events() {
    let tmp_dir = TempDir::new().unwrap();
    let plan = write_plan(
        &tmp_dir,
        "plan.yaml",
        r#"
name: monitoring
jobType: MONITORING
stages:
  - description: rules
    faultTolerance: SKIP_STAGE
    items: [r1, r2, r3, r4]
    fail: [r2]
  - description: optional
    skip: nothing configured
  - description: report
"#,
    );

    let assert = jobtrack()
        .args(["run", plan.to_str().unwrap(), "--events"])
        .assert()
        .success();

    let stdout = stdout_of(&assert);
    assert!(stdout.starts_with("COMPLETED monitoring"), "{stdout}");
    assert!(stdout.contains("[FAILED] rules (SKIP_STAGE) ok=1 failed=1 skipped=2 50%"));
    assert!(stdout.contains("[SKIPPED] optional (NONE) ok=0 failed=0 skipped=0 - "));
    assert!(stdout.contains("Process `monitoring` completed"));
}
