//! CLI exit-code and config-dump behavior.

use assert_cmd::Command;
use predicates::prelude::*;

fn flagsync() -> Command {
    let mut cmd = Command::cargo_bin("flagsync").expect("binary");
    // Isolate from any ambient configuration.
    for var in [
        "FLAGSYNC_SDK_KEY",
        "FLAGSYNC_FLAGS",
        "FLAGSYNC_ENV_FILE",
        "FLAGSYNC_BACKUP",
        "FLAGSYNC_LOG",
        "FLAGSYNC_DEBOUNCE_MS",
        "FLAGSYNC_CONTEXT_KEY",
        "FLAGSYNC_CONTEXT_NAME",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn run_without_credential_exits_with_code_2() {
    flagsync()
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("FLAGSYNC_SDK_KEY"));
}

#[test]
fn run_with_blank_credential_exits_with_code_2() {
    flagsync()
        .env("FLAGSYNC_SDK_KEY", "   ")
        .arg("run")
        .assert()
        .code(2);
}

#[test]
fn config_dump_shows_defaults_and_redacts_credential() {
    flagsync()
        .env("FLAGSYNC_SDK_KEY", "sdk-secret-value")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("SAMPLE_API_URL"))
        .stdout(predicate::str::contains("\"credential_set\": true"))
        .stdout(predicate::str::contains("\"debounce_ms\": 400"))
        .stdout(predicate::str::contains("sdk-secret-value").not());
}

#[test]
fn config_reports_missing_credential_without_failing() {
    flagsync()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"credential_set\": false"));
}

#[test]
fn invalid_debounce_value_is_reported() {
    flagsync()
        .env("FLAGSYNC_SDK_KEY", "sdk-abc")
        .env("FLAGSYNC_DEBOUNCE_MS", "soon")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLAGSYNC_DEBOUNCE_MS"));
}
