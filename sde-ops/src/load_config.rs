//! `load_config`: builds the handler settings from an optional YAML file and the environment.
//!
//! Every setting can come from either place and environment variables win
//! over the file. Deployed functions run without a file. Secrets such as
//! `SLACK_HOOK_URL` belong in the environment.
//!
//! ```yaml
//! forwarder:
//!   pending_area_name: sde-pending
//!   rejected_area_name: sde-rejected
//!   source_email_address: noreply@example.com
//!   max_object_size_bytes: 1048576
//! banner:
//!   notices_table_name: Notices
//!   timezone: Europe/London
//! alert:
//!   aws_region: eu-west-2
//! ```
//!
//! Errors are `anyhow::Error` and name the variable that is missing or invalid.

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use sde_ops_core::config::{
    AlertConfig, BannerConfig, ForwarderConfig, DEFAULT_AWS_REGION, DEFAULT_BANNER_TIMEZONE,
    DEFAULT_MAX_OBJECT_SIZE_BYTES, DEFAULT_SUPPORT_EMAIL_ADDRESS,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const PENDING_AREA_NAME: &str = "PENDING_AREA_NAME";
pub const REJECTED_AREA_NAME: &str = "REJECTED_AREA_NAME";
pub const SOURCE_EMAIL_ADDRESS: &str = "SOURCE_EMAIL_ADDRESS";
pub const MAX_OBJECT_SIZE_BYTES: &str = "MAX_OBJECT_SIZE_BYTES";
pub const SUPPORT_EMAIL_ADDRESS: &str = "SUPPORT_EMAIL_ADDRESS";
pub const DDB_NOTICES_TABLE_NAME: &str = "DDB_NOTICES_TABLE_NAME";
pub const BANNER_TIMEZONE: &str = "BANNER_TIMEZONE";
pub const SLACK_HOOK_URL: &str = "SLACK_HOOK_URL";
pub const AWS_REGION: &str = "AWS_REGION";

/// The YAML file as written. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub forwarder: ForwarderSection,
    #[serde(default)]
    pub banner: BannerSection,
    #[serde(default)]
    pub alert: AlertSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForwarderSection {
    pub pending_area_name: Option<String>,
    pub rejected_area_name: Option<String>,
    pub source_email_address: Option<String>,
    pub max_object_size_bytes: Option<i64>,
    pub support_email_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BannerSection {
    pub notices_table_name: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertSection {
    pub slack_hook_url: Option<String>,
    pub aws_region: Option<String>,
}

/// Reads the YAML file, or returns an empty config when no path is given.
pub fn read_config_file(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    // An empty file parses to `null`.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML: {e}")
    })
}

/// The environment value if set and non-empty, else the file value.
fn setting(name: &str, file_value: Option<String>) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or(file_value)
}

fn required(name: &str, file_value: Option<String>) -> Result<String> {
    setting(name, file_value).ok_or_else(|| {
        error!(variable = name, "Required setting is missing");
        anyhow!("{name} must be set in the environment or the config file")
    })
}

pub fn load_forwarder_config(path: Option<&Path>) -> Result<ForwarderConfig> {
    let section = read_config_file(path)?.forwarder;

    let max_object_size_bytes = match env::var(MAX_OBJECT_SIZE_BYTES)
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .with_context(|| format!("{MAX_OBJECT_SIZE_BYTES} must be a whole number, got {raw:?}"))?,
        None => section
            .max_object_size_bytes
            .unwrap_or(DEFAULT_MAX_OBJECT_SIZE_BYTES),
    };

    let config = ForwarderConfig {
        pending_bucket: required(PENDING_AREA_NAME, section.pending_area_name)?,
        rejected_bucket: required(REJECTED_AREA_NAME, section.rejected_area_name)?,
        source_email: required(SOURCE_EMAIL_ADDRESS, section.source_email_address)?,
        max_object_size_bytes,
        support_email: setting(SUPPORT_EMAIL_ADDRESS, section.support_email_address)
            .unwrap_or_else(|| DEFAULT_SUPPORT_EMAIL_ADDRESS.to_string()),
    };
    config.trace_loaded();
    Ok(config)
}

pub fn load_banner_config(path: Option<&Path>) -> Result<BannerConfig> {
    let section = read_config_file(path)?.banner;

    let timezone = match setting(BANNER_TIMEZONE, section.timezone) {
        Some(raw) => raw
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("{BANNER_TIMEZONE} {raw:?} is not a known timezone: {e}"))?,
        None => DEFAULT_BANNER_TIMEZONE,
    };

    let config = BannerConfig {
        notices_table: required(DDB_NOTICES_TABLE_NAME, section.notices_table_name)?,
        timezone,
    };
    config.trace_loaded();
    Ok(config)
}

pub fn load_alert_config(path: Option<&Path>) -> Result<AlertConfig> {
    let section = read_config_file(path)?.alert;

    let config = AlertConfig {
        slack_hook_url: required(SLACK_HOOK_URL, section.slack_hook_url)?,
        aws_region: setting(AWS_REGION, section.aws_region)
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
    };
    config.trace_loaded();
    Ok(config)
}
