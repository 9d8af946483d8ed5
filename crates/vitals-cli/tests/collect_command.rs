use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn app_vitals_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("app-vitals")
}

#[test]
fn test_collect_command_help() {
    let mut cmd = Command::new(app_vitals_bin());
    cmd.arg("collect").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Collect vitals for every configured app"))
        .stdout(predicate::str::contains("--days"))
        .stdout(predicate::str::contains("--apps"))
        .stdout(predicate::str::contains("--profile"))
        .stdout(predicate::str::contains("--service-account"))
        .stdout(predicate::str::contains("--phase-deadline"));
}

#[test]
fn test_collect_rejects_unsupported_window() {
    let mut cmd = Command::new(app_vitals_bin());
    cmd.arg("collect").arg("14");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected 7 or 30"));
}

#[test]
fn test_collect_rejects_unsupported_days_flag() {
    let mut cmd = Command::new(app_vitals_bin());
    cmd.arg("collect").arg("--days=90");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected 7 or 30"));
}

#[test]
fn test_collect_window_given_twice() {
    let mut cmd = Command::new(app_vitals_bin());
    cmd.arg("collect").arg("7").arg("--days").arg("30");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_collect_unknown_app_fails_before_browser_starts() {
    let mut cmd = Command::new(app_vitals_bin());
    cmd.arg("collect").arg("--apps").arg("partner,driver");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Launching Chrome").not())
        .stderr(predicate::str::contains("Unknown app: driver"));
}

#[test]
fn test_profile_and_temp_conflict() {
    let mut cmd = Command::new(app_vitals_bin());
    cmd.arg("collect").arg("--profile").arg("work").arg("--temp");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
