//! Smoke tests -- verify the binary runs and key subcommands are wired.

use assert_cmd::Command;
use predicates::prelude::*;

fn costanomaly() -> Command {
    let mut cmd = Command::cargo_bin("costanomaly").unwrap();
    cmd.env_remove("COSTANOMALY_CONFIG")
        .env_remove("COSTANOMALY_CLIENT_SECRET")
        .env_remove("COSTANOMALY_SCORING_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    costanomaly()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cost anomaly detection"));
}

#[test]
fn test_cli_version() {
    costanomaly()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("costanomaly"));
}

#[test]
fn test_period_subcommand() {
    costanomaly()
        .args(["period", "2 weeks"])
        .assert()
        .success()
        .stdout("14\n");

    costanomaly()
        .args(["period", "nonsense"])
        .assert()
        .success()
        .stdout("90\n");
}

#[test]
fn test_schedule_dry_run_from_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("costanomaly.toml");
    std::fs::write(&path, "[schedule]\ncron = \"0 0 3 * * *\"\n").unwrap();

    costanomaly()
        .arg("--config")
        .arg(&path)
        .args(["schedule", "dry-run", "--hours", "48"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upcoming runs (next 48 hours):"));
}

#[test]
fn test_run_without_credentials_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("costanomaly.toml");
    std::fs::write(&path, "[detection]\nperiod = \"90 days\"\n").unwrap();

    costanomaly()
        .arg("--config")
        .arg(&path)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required settings"));
}

#[test]
fn test_missing_config_file_fails() {
    costanomaly()
        .args(["--config", "/nonexistent/costanomaly.toml", "run"])
        .assert()
        .failure();
}

#[test]
fn test_config_path_from_environment() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("costanomaly.toml");
    std::fs::write(&path, "[schedule]\ncron = \"0 0 3 * * *\"\n").unwrap();

    costanomaly()
        .env("COSTANOMALY_CONFIG", &path)
        .args(["schedule", "dry-run", "--hours", "48"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upcoming runs (next 48 hours):"));

    costanomaly()
        .env("COSTANOMALY_CONFIG", "/nonexistent/costanomaly.toml")
        .args(["schedule", "dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}
