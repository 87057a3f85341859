use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

const SETTINGS: [&str; 6] = [
    "PENDING_AREA_NAME",
    "REJECTED_AREA_NAME",
    "SOURCE_EMAIL_ADDRESS",
    "DDB_NOTICES_TABLE_NAME",
    "SLACK_HOOK_URL",
    "BANNER_TIMEZONE",
];

fn sde_ops() -> Command {
    let mut cmd = Command::cargo_bin("sde-ops").expect("binary should build");
    for name in SETTINGS {
        cmd.env_remove(name);
    }
    cmd
}

fn json_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Creating temp file failed");
    write(file.path(), content).expect("Writing temp file failed");
    file
}

#[test]
fn test_help_lists_subcommands() {
    sde_ops()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("forward"))
        .stdout(predicate::str::contains("weekly-banner"))
        .stdout(predicate::str::contains("add-notices"))
        .stdout(predicate::str::contains("slack-alert"))
        .stdout(predicate::str::contains("lambda"));
}

#[test]
fn test_forward_without_settings_names_missing_variable() {
    let event = json_file(r#"{"Records": []}"#);
    sde_ops()
        .args(["forward", "--event"])
        .arg(event.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("PENDING_AREA_NAME"));
}

#[test]
fn test_forward_with_missing_event_file_fails() {
    sde_ops()
        .args(["forward", "--event", "/nonexistent/event.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_add_notices_rejects_non_array_file() {
    let notices = json_file(r#"{"notification": "not in an array"}"#);
    sde_ops()
        .args(["add-notices", "--file"])
        .arg(notices.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array of notices"));
}

#[test]
fn test_slack_alert_requires_hook_url() {
    let event = json_file(r#"{"Records": [{"Sns": {"Message": "{}"}}]}"#);
    sde_ops()
        .args(["slack-alert", "--event"])
        .arg(event.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("SLACK_HOOK_URL"));
}

#[test]
fn test_lambda_rejects_unknown_function() {
    sde_ops()
        .args(["lambda", "not-a-function"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
