//! CLI tests for the combine / analyze / run stages

use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn write_dataset(dir: &Path) {
    let mut metadata = String::from("ID;SEX;AGE;ACC;ACC_TIME;ACC_DAYS;HRV;HRV_TIME;HRV_HOURS;CPT_II;ADHD\n");
    // Four subjects per sex, two control and two condition
    let subjects = [
        (1, 0, 1, [200, 210, 220]),
        (2, 0, 1, [230, 250, 240]),
        (3, 0, 0, [100, 90, 110]),
        (4, 0, 0, [120, 130, 125]),
        (5, 1, 1, [300, 310, 305]),
        (6, 1, 1, [280, 290, 270]),
        (7, 1, 0, [150, 160, 155]),
        (8, 1, 0, [170, 175, 180]),
    ];
    for (id, sex, condition, values) in subjects {
        metadata.push_str(&format!("{};{};1;1;;;1;;;1;{}\n", id, sex, condition));
        let mut activity = String::from("TIMESTAMP;ACTIVITY\n");
        for value in values {
            activity.push_str(&format!("t;{}\n", value));
        }
        fs::write(dir.join(format!("patient_activity_{:02}.csv", id)), activity).unwrap();
    }
    fs::write(dir.join("patient_info.csv"), metadata).unwrap();
}

#[test]
fn test_combine_writes_four_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let out = dir.path().join("out");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohortstat");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out)
        .arg("combine")
        .assert()
        .success()
        .stdout(predicate::str::contains("Combined 8 subjects"))
        .stdout(predicate::str::contains("8 considered, 0 without attributes, 0 without data"));

    for name in [
        "patient_activity_combined_f.csv",
        "patient_activity_combined_m.csv",
        "patient_activity_c_combined_f.csv",
        "patient_activity_c_combined_m.csv",
    ] {
        let table = fs::read_to_string(out.join(name)).unwrap();
        assert_eq!(table.lines().count(), 2, "{}", name);
    }
}

#[test]
fn test_run_reports_variance_ratios_and_verdicts() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohortstat");
    cmd.arg("-d")
        .arg(dir.path())
        .arg("-o")
        .arg(dir.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Variance ratio females"))
        .stdout(predicate::str::contains("Variance ratio males"))
        .stdout(predicate::str::contains("null hypothesis"));

    assert!(dir
        .path()
        .join("condition_vs_control_movement_scatter.svg")
        .exists());
    assert!(dir.path().join("female_condition_vs_control.svg").exists());
}

#[test]
fn test_run_json_format() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohortstat");
    let output = cmd
        .arg("-d")
        .arg(dir.path())
        .arg("-o")
        .arg(dir.path())
        .arg("--format")
        .arg("json")
        .arg("--no-charts")
        .arg("run")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["comparisons"].as_array().unwrap().len(), 2);
    assert!(!dir.path().join("female_condition_vs_control.svg").exists());
}

#[test]
fn test_combine_missing_metadata_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohortstat");
    cmd.arg("-d")
        .arg(dir.path())
        .arg("-o")
        .arg(dir.path())
        .arg("combine")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load metadata"));
}

#[test]
fn test_config_file_alpha() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let config = dir.path().join("cohortstat.toml");
    fs::write(
        &config,
        format!(
            "[input]\ndata_dir = {:?}\n\n[output]\ndir = {:?}\nrender_charts = false\n\n[analysis]\nalpha = 0.05\n",
            dir.path(),
            dir.path()
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohortstat");
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("= alpha"))
        .stdout(predicate::str::contains("0.05"));
}

#[test]
fn test_missing_stage_is_usage_error() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohortstat");
    cmd.assert().failure();
}
