//! Builds the core handlers with their production clients.
//!
//! Settings are loaded before any AWS client is created, so a missing
//! variable fails fast without touching the network.

use anyhow::{anyhow, Result};
use sde_ops_core::alert::AlertRelay;
use sde_ops_core::config::{BannerConfig, DEFAULT_AWS_REGION};
use sde_ops_core::forwarder::Forwarder;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::aws::{
    load_sdk_config, CloudWatchLogQuery, DynamoNoticeStore, S3ObjectStore, SesEmailSender,
};
use crate::load_config::{load_alert_config, load_banner_config, load_forwarder_config};
use crate::slack::SlackWebhook;

pub type S3Forwarder = Forwarder<S3ObjectStore, SesEmailSender>;
pub type SlackAlertRelay = AlertRelay<CloudWatchLogQuery, SlackWebhook>;

pub async fn build_forwarder(config_path: Option<&Path>) -> Result<S3Forwarder> {
    let config = load_forwarder_config(config_path)?;
    let sdk_config = load_sdk_config(DEFAULT_AWS_REGION).await;
    Ok(Forwarder::new(
        S3ObjectStore::from_sdk_config(&sdk_config),
        SesEmailSender::from_sdk_config(&sdk_config),
        config,
    ))
}

pub async fn build_notice_store(
    config_path: Option<&Path>,
) -> Result<(DynamoNoticeStore, BannerConfig)> {
    let config = load_banner_config(config_path)?;
    let sdk_config = load_sdk_config(DEFAULT_AWS_REGION).await;
    Ok((DynamoNoticeStore::from_sdk_config(&sdk_config), config))
}

pub async fn build_alert_relay(config_path: Option<&Path>) -> Result<SlackAlertRelay> {
    let config = load_alert_config(config_path)?;
    let sdk_config = load_sdk_config(&config.aws_region).await;
    let webhook = SlackWebhook::new(config.slack_hook_url.clone());
    Ok(AlertRelay::new(
        CloudWatchLogQuery::from_sdk_config(&sdk_config),
        webhook,
        config,
    ))
}

/// Reads a JSON document (an event or a notices file) from disk.
pub fn read_json(path: &Path) -> Result<Value> {
    info!(path = ?path, "Reading JSON input");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = ?path, "Failed to read JSON input");
        anyhow!("Failed to read {:?}: {}", path, e)
    })?;
    serde_json::from_str(&content).map_err(|e| {
        error!(error = ?e, path = ?path, "Failed to parse JSON input");
        anyhow!("Failed to parse JSON in {:?}: {}", path, e)
    })
}
