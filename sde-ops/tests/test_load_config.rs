use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

use sde_ops::load_config::{
    load_alert_config, load_banner_config, load_forwarder_config, read_config_file,
};

const ALL_VARS: [&str; 9] = [
    "PENDING_AREA_NAME",
    "REJECTED_AREA_NAME",
    "SOURCE_EMAIL_ADDRESS",
    "MAX_OBJECT_SIZE_BYTES",
    "SUPPORT_EMAIL_ADDRESS",
    "DDB_NOTICES_TABLE_NAME",
    "BANNER_TIMEZONE",
    "SLACK_HOOK_URL",
    "AWS_REGION",
];

fn clear_env() {
    for name in ALL_VARS {
        env::remove_var(name);
    }
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// Environment alone is enough for the forwarder, with defaults filled in.
#[test]
#[serial]
fn test_forwarder_config_from_env_with_defaults() {
    clear_env();
    env::set_var("PENDING_AREA_NAME", "sde-pending");
    env::set_var("REJECTED_AREA_NAME", "sde-rejected");
    env::set_var("SOURCE_EMAIL_ADDRESS", "noreply@example.com");

    let config = load_forwarder_config(None).expect("config should load");
    assert_eq!(config.pending_bucket, "sde-pending");
    assert_eq!(config.rejected_bucket, "sde-rejected");
    assert_eq!(config.source_email, "noreply@example.com");
    assert_eq!(config.max_object_size_bytes, 1_048_576);
    assert_eq!(config.support_email, "england.sde.input-checks@nhs.net");
    clear_env();
}

/// Environment variables override the file.
#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = config_file(
        r#"
forwarder:
  pending_area_name: file-pending
  rejected_area_name: file-rejected
  source_email_address: file@example.com
  max_object_size_bytes: 2048
"#,
    );
    env::set_var("PENDING_AREA_NAME", "env-pending");
    env::set_var("MAX_OBJECT_SIZE_BYTES", "4096");

    let config = load_forwarder_config(Some(file.path())).expect("config should load");
    assert_eq!(config.pending_bucket, "env-pending");
    assert_eq!(config.rejected_bucket, "file-rejected");
    assert_eq!(config.source_email, "file@example.com");
    assert_eq!(config.max_object_size_bytes, 4096);
    clear_env();
}

#[test]
#[serial]
fn test_missing_required_setting_is_named() {
    clear_env();
    env::set_var("PENDING_AREA_NAME", "sde-pending");
    env::set_var("SOURCE_EMAIL_ADDRESS", "noreply@example.com");

    let err = load_forwarder_config(None).unwrap_err();
    assert!(
        err.to_string().contains("REJECTED_AREA_NAME"),
        "error should name the variable, got: {err}"
    );
    clear_env();
}

#[test]
#[serial]
fn test_invalid_max_size_is_rejected() {
    clear_env();
    env::set_var("PENDING_AREA_NAME", "p");
    env::set_var("REJECTED_AREA_NAME", "r");
    env::set_var("SOURCE_EMAIL_ADDRESS", "s@example.com");
    env::set_var("MAX_OBJECT_SIZE_BYTES", "a lot");

    let err = load_forwarder_config(None).unwrap_err();
    assert!(err.to_string().contains("MAX_OBJECT_SIZE_BYTES"));
    clear_env();
}

#[test]
#[serial]
fn test_banner_config_timezone() {
    clear_env();
    env::set_var("DDB_NOTICES_TABLE_NAME", "Notices");

    let config = load_banner_config(None).expect("config should load");
    assert_eq!(config.notices_table, "Notices");
    assert_eq!(config.timezone, chrono_tz::Europe::London);

    env::set_var("BANNER_TIMEZONE", "Europe/Dublin");
    let config = load_banner_config(None).expect("config should load");
    assert_eq!(config.timezone, chrono_tz::Europe::Dublin);

    env::set_var("BANNER_TIMEZONE", "Mars/Olympus_Mons");
    assert!(load_banner_config(None).is_err());
    clear_env();
}

#[test]
#[serial]
fn test_alert_config_requires_hook_url() {
    clear_env();
    assert!(load_alert_config(None)
        .unwrap_err()
        .to_string()
        .contains("SLACK_HOOK_URL"));

    let file = config_file("alert:\n  slack_hook_url: https://hooks.slack.test/x\n");
    let config = load_alert_config(Some(file.path())).expect("config should load");
    assert_eq!(config.slack_hook_url, "https://hooks.slack.test/x");
    assert_eq!(config.aws_region, "eu-west-2");
    clear_env();
}

#[test]
#[serial]
fn test_invalid_yaml_is_reported() {
    let file = config_file("not-yaml: [:::");
    let err = read_config_file(Some(file.path())).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_empty_file_is_an_empty_config() {
    let file = config_file("");
    let config = read_config_file(Some(file.path())).expect("empty file is allowed");
    assert!(config.forwarder.pending_area_name.is_none());
    assert!(config.alert.slack_hook_url.is_none());
}
