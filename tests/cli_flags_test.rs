//! CLI flag contract tests
//!
//! Runs the binary against a model document in a temp directory and checks
//! the JSON report, config discovery and --skip-analyzer / --output.

use std::path::Path;
use std::process::Command;

fn oometrics_bin() -> String {
    env!("CARGO_BIN_EXE_oometrics").to_string()
}

const MODEL: &str = r#"{
    "program": "cars",
    "entities": [
        { "kind": "Namespace", "qualified_name": "garage" },
        { "kind": "Class", "qualified_name": "garage::Car", "scope": "garage",
          "size": { "logical_lines": 3, "comments": [ { "first_line": 1, "last_line": 2, "role": "documentation" } ] } },
        { "kind": "Class", "qualified_name": "garage::PlayerCar", "scope": "garage", "size": { "logical_lines": 2 } },
        { "kind": "Attribute", "qualified_name": "garage::Car::speed", "scope": "garage::Car" },
        { "kind": "Method", "qualified_name": "garage::Car::drive", "scope": "garage::Car",
          "tokens": { "tokens": [
              { "operator": { "keyword": "void" } },
              { "operand": { "spelling": "drive", "binding": { "declaration": 1 } } },
              { "operand": { "spelling": "speed", "binding": { "declaration": 2 } } },
              { "operator": { "punctuation": "++" } },
              { "operator": { "delimiter": "statement" } }
          ] } }
    ],
    "edges": [
        { "source": "garage::PlayerCar", "target": "garage::Car", "kind": "Inherits" },
        { "source": "garage::Car::drive", "target": "garage::Car::speed", "kind": "AccessesAttribute" }
    ]
}"#;

fn setup_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("model.json"), MODEL).unwrap();
    dir
}

fn run_cli(dir: &Path, extra_args: &[&str]) -> (i32, String, String) {
    let output = Command::new(oometrics_bin())
        .arg(dir.join("model.json"))
        .args(extra_args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute oometrics binary");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Value of `metric` for the entity named `name` in a JSON report
fn metric(report: &serde_json::Value, name: &str, metric: &str) -> Option<f64> {
    let names = report["entity_names"].as_object()?;
    let id = names
        .iter()
        .find(|(_, v)| v.as_str() == Some(name))
        .map(|(k, _)| k.clone())?;
    report["results"]["entities"][&id][metric].as_f64()
}

#[test]
fn test_json_report_on_stdout() {
    let dir = setup_workspace();
    let (code, stdout, stderr) = run_cli(dir.path(), &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(report["program"], "cars");
    assert_eq!(metric(&report, "garage::Car", "NOC"), Some(1.0));
    assert_eq!(metric(&report, "garage::PlayerCar", "NOA"), Some(1.0));
    assert_eq!(metric(&report, "garage::Car", "LCOM5"), Some(1.0));
    assert_eq!(metric(&report, "garage::Car", "DLOC"), Some(2.0));
    assert_eq!(metric(&report, "garage::Car::drive", "N1"), Some(3.0));
    assert_eq!(metric(&report, "garage::Car::drive", "n2"), Some(2.0));
    assert_eq!(metric(&report, "garage", "TLLOC"), Some(5.0));
    assert_eq!(metric(&report, "cars", "TNCL"), Some(2.0));
    assert_eq!(report["summary"]["analyzers_failed"], 0);
}

#[test]
fn test_skip_analyzer_flag() {
    let dir = setup_workspace();
    let (code, stdout, _) = run_cli(dir.path(), &["--skip-analyzer", "halstead"]);
    assert_eq!(code, 0);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(metric(&report, "garage::Car::drive", "N1"), None);
    assert_eq!(metric(&report, "garage::Car", "NOC"), Some(1.0));
}

#[test]
fn test_output_flag_writes_file() {
    let dir = setup_workspace();
    let out = dir.path().join("metrics.json");
    let (code, stdout, _) = run_cli(dir.path(), &["--output", out.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.trim().is_empty());

    let content = std::fs::read_to_string(&out).expect("output file written");
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(metric(&report, "garage::Car", "CBOI"), Some(1.0));
}

#[test]
fn test_config_next_to_model_is_picked_up() {
    let dir = setup_workspace();
    std::fs::write(
        dir.path().join("oometrics.toml"),
        "[engine]\ndisabled_analyzers = [\"size\"]\n",
    )
    .unwrap();

    let (code, stdout, _) = run_cli(dir.path(), &[]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(metric(&report, "garage::Car", "LLOC"), None);
    assert_eq!(metric(&report, "cars", "TLLOC"), None);
}

#[test]
fn test_invalid_inputs_fail() {
    let dir = setup_workspace();
    let (code, _, _) = run_cli(dir.path(), &["--workers", "0"]);
    assert_ne!(code, 0);

    std::fs::write(dir.path().join("model.json"), "{ not json").unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &[]);
    assert_ne!(code, 0);
    assert!(stderr.contains("model"), "stderr: {}", stderr);
}
