use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn edifice() -> Command {
    Command::cargo_bin("edifice").unwrap()
}

fn config_in(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn check_accepts_valid_config() {
    let dir = TempDir::new().unwrap();
    let path = config_in(
        &dir,
        r#"
[mqtt]
host = "broker.example"

[[directory]]
source = "t-1"
building = "hq"
"#,
    );

    edifice()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"))
        .stdout(predicate::str::contains("broker.example:1883"))
        .stdout(predicate::str::contains("1 sources"));
}

#[test]
fn check_reports_invalid_config() {
    let dir = TempDir::new().unwrap();
    let path = config_in(&dir, "[mqtt]\nqos = 7\n");

    edifice()
        .current_dir(dir.path())
        .args(["check", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("mqtt.qos"));
}

#[test]
fn check_fails_on_missing_file() {
    let dir = TempDir::new().unwrap();
    edifice()
        .current_dir(dir.path())
        .args(["--config", "nowhere.toml", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not load nowhere.toml"));
}

#[test]
fn help_lists_subcommands() {
    edifice()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}
