use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn write_session_csv(dir: &tempfile::TempDir) -> PathBuf {
    let csv = "real_weight_g,adc_raw,tare\n0,1000,1000\n100,1200,1000\n200,1400,1000\n";
    let path = dir.path().join("session.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn capscale() -> Command {
    Command::cargo_bin("capscale").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["fit"], 2, "required", "stderr")]
#[case(&["bogus"], 2, "unrecognized", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = capscale().args(args).assert().code(exit_code);
    let out = assert.get_output();
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(text.contains(needle), "expected '{needle}' in {stream}: {text}");
}

#[test]
fn fit_reports_linear_model() {
    let dir = tempdir().unwrap();
    let csv = write_session_csv(&dir);
    capscale()
        .args(["fit", "--samples"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("samples: 3"))
        .stdout(predicate::str::contains("model: Linear [delta]"))
        .stdout(predicate::str::contains("3/3"));
}

#[test]
fn fit_json_is_one_object() {
    let dir = tempdir().unwrap();
    let csv = write_session_csv(&dir);
    let out = capscale()
        .args(["--json", "fit", "--samples"])
        .arg(&csv)
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["samples"], 3);
    assert_eq!(v["model"]["key"], "linear");
    assert_eq!(v["model"]["used_samples"], 3);
    let slope = v["model"]["coefficients"][0].as_f64().unwrap();
    assert!((slope - 0.055_396_406_8).abs() < 1e-8);
    assert_eq!(v["rows"].as_array().unwrap().len(), 3);
    assert_eq!(v["rows"][1]["delta_counts"], 200);
}

#[test]
fn fit_exports_sample_table() {
    let dir = tempdir().unwrap();
    let csv = write_session_csv(&dir);
    let export = dir.path().join("out.csv");
    capscale()
        .args(["fit", "--samples"])
        .arg(&csv)
        .arg("--export")
        .arg(&export)
        .assert()
        .success();

    let text = fs::read_to_string(&export).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,timestamp,real_weight_g,adc_raw,delta_counts,feature_key,feature_value,reference_capacity_pf,predicted_capacity_pf,predicted_weight_g,active_capacity_pf,active_weight_g,capacity_error_pf,weight_error_g,model_tag"
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[2].starts_with("3,"));
    assert!(rows[2].ends_with("linear|inv=0|feat=delta"));
    assert!(!dir.path().join("out.new").exists());
}

#[test]
fn bad_csv_header_is_explained() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "weight,raw\n1,2\n").unwrap();
    capscale()
        .args(["fit", "--samples"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("real_weight_g,adc_raw,tare"));
}

#[test]
fn invalid_config_exits_two() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[fit]\nridge_lambda = -1.0\n");
    capscale()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fit.ridge_lambda"));
}

#[test]
fn invalid_config_json_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[model]\nfamily = \"cubic\"\n");
    let out = capscale()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let line = String::from_utf8_lossy(&out.stderr)
        .lines()
        .find(|l| l.contains("\"reason\""))
        .map(str::to_string)
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["reason"], "ConfigError");
}

#[test]
fn scripted_session_applies_model() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.txt");
    fs::write(
        &script,
        "# calibrate with two weights\nplace 0\ntare\nplace 100\nadd 100\nplace 250\nadd 250\napply\nplace 100\nread\nshow\nquit\nadd 500\n",
    )
    .unwrap();
    capscale()
        .args(["session", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("tare: 1000 counts"))
        .stdout(predicate::str::contains("sample #2 added"))
        .stdout(predicate::str::contains("applied Linear"))
        .stdout(predicate::str::contains("runtime: Linear"))
        .stdout(predicate::str::contains("sample #3").not());
}

#[test]
fn session_reads_stdin_as_json_lines() {
    let out = capscale()
        .args(["--json", "session"])
        .write_stdin("tare\nadd 50\nreset\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let events: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["event"], "tare");
    assert_eq!(events[1]["id"], 1);
    assert_eq!(events[2]["event"], "reset");
}

#[test]
fn session_show_json_carries_config_and_overlay() {
    let out = capscale()
        .args(["--json", "session"])
        .write_stdin("tare\nplace 100\nadd 100\nplace 200\nadd 200\nset sigma 1.5\nshow\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let show: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(show["event"], "show");
    assert_eq!(show["config"]["fit"]["family"], "linear");
    assert_eq!(show["config"]["fit"]["outlier_sigma"], 1.5);
    assert_eq!(show["config"]["reference"]["a"], 2.95);
    assert_eq!(show["model"]["label"], "Linear");
    assert!(show["runtime"].is_null());
    assert_eq!(show["rows"][0]["feature_key"], "delta");
    let from = show["overlay"]["from"].as_array().unwrap();
    let to = show["overlay"]["to"].as_array().unwrap();
    assert!(from[0].as_f64().unwrap() < to[0].as_f64().unwrap());
}

#[test]
fn unknown_session_command_fails_with_line_number() {
    capscale()
        .arg("session")
        .write_stdin("tare\nwiggle\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 2"));
}
