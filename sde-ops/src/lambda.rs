//! Serves one handler as an AWS Lambda function.

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::ValueEnum;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use sde_ops_core::banner::add_weekly_banner;
use sde_ops_core::config::BannerConfig;
use sde_ops_core::contract::Notice;
use sde_ops_core::forwarder::ForwarderResponse;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::aws::DynamoNoticeStore;
use crate::handlers::{
    build_alert_relay, build_forwarder, build_notice_store, S3Forwarder, SlackAlertRelay,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LambdaFunction {
    /// S3 upload notifications into the data-in forwarder
    Forwarder,
    /// Scheduled event writing the weekly maintenance banner
    WeeklyBanner,
    /// SNS alarm notifications relayed to Slack
    SlackAlert,
}

async fn forward(event: LambdaEvent<Value>, forwarder: &S3Forwarder) -> Result<ForwarderResponse, Error> {
    Ok(forwarder.handle(&event.payload).await)
}

async fn weekly_banner(
    _event: LambdaEvent<Value>,
    store: &DynamoNoticeStore,
    config: &BannerConfig,
) -> Result<Notice, Error> {
    Ok(add_weekly_banner(store, config, Utc::now()).await?)
}

async fn slack_alert(event: LambdaEvent<Value>, relay: &SlackAlertRelay) -> Result<Value, Error> {
    Ok(relay.handle(&event.payload).await?)
}

/// Runs the Lambda event loop for `function` until the runtime shuts down.
pub async fn serve(function: LambdaFunction, config_path: Option<&Path>) -> Result<()> {
    info!(?function, "Starting Lambda runtime");
    let result = match function {
        LambdaFunction::Forwarder => {
            let forwarder = build_forwarder(config_path).await?;
            run(service_fn(|event| forward(event, &forwarder))).await
        }
        LambdaFunction::WeeklyBanner => {
            let (store, config) = build_notice_store(config_path).await?;
            run(service_fn(|event| weekly_banner(event, &store, &config))).await
        }
        LambdaFunction::SlackAlert => {
            let relay = build_alert_relay(config_path).await?;
            run(service_fn(|event| slack_alert(event, &relay))).await
        }
    };
    result.map_err(|e| anyhow!("Lambda runtime failed: {e}"))
}
