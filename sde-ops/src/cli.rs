//! # sde-ops CLI
//!
//! Command-line entrypoint for the operational handlers. Each subcommand runs
//! one handler once against a JSON input, except `lambda`, which serves a
//! handler under the Lambda runtime.
//!
//! All business logic lives in `sde-ops-core`; this module only loads
//! settings, builds clients and prints results as JSON on stdout. Logs go to
//! stderr.
//!
//! ## Extending
//! Add a variant to [`Commands`] and a match arm in [`run`]. Keep the handler
//! itself in the core crate.

use crate::handlers::{build_alert_relay, build_forwarder, build_notice_store, read_json};
use crate::lambda::{serve, LambdaFunction};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sde_ops_core::banner::{add_notices, add_weekly_banner, NoticeRequest};
use serde_json::{json, Value};
use std::path::PathBuf;

/// CLI for the SDE operational functions.
#[derive(Parser)]
#[clap(
    name = "sde-ops",
    version,
    about = "Validate and route CSV uploads, manage portal banners and relay alarms to Slack"
)]
pub struct Cli {
    /// Optional YAML config file; environment variables override its values
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and route one uploaded object, given an S3 event notification
    Forward {
        /// Path to the S3 event JSON
        #[clap(long)]
        event: PathBuf,
    },
    /// Write the banner for the next weekly maintenance window
    WeeklyBanner,
    /// Validate and write portal banners from a JSON file
    AddNotices {
        /// Path to a JSON array of notices
        #[clap(long)]
        file: PathBuf,
    },
    /// Relay one SNS alarm notification to Slack
    SlackAlert {
        /// Path to the SNS event JSON
        #[clap(long)]
        event: PathBuf,
    },
    /// Serve a handler under the AWS Lambda runtime
    Lambda {
        #[clap(value_enum)]
        function: LambdaFunction,
    },
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Async CLI entrypoint, shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Forward { event } => {
            let event = read_json(&event)?;
            let forwarder = build_forwarder(config_path).await?;
            tracing::info!(command = "forward", "Forwarding uploaded object");
            let response = forwarder.handle(&event).await;
            print_json(&serde_json::to_value(&response)?)?;
            if response.status_code != sde_ops_core::forwarder::ForwarderResponse::OK {
                return Err(anyhow!(
                    "Forwarder returned {}: {}",
                    response.status_code,
                    response.message().unwrap_or(response.body)
                ));
            }
            Ok(())
        }
        Commands::WeeklyBanner => {
            let (store, config) = build_notice_store(config_path).await?;
            tracing::info!(command = "weekly-banner", "Adding weekly banner");
            let notice = add_weekly_banner(&store, &config, Utc::now()).await?;
            print_json(&serde_json::to_value(&notice)?)
        }
        Commands::AddNotices { file } => {
            let requests: Vec<NoticeRequest> = serde_json::from_value(read_json(&file)?)
                .with_context(|| format!("{file:?} must hold a JSON array of notices"))?;
            let (store, config) = build_notice_store(config_path).await?;
            tracing::info!(command = "add-notices", count = requests.len(), "Adding notices");
            let report = add_notices(&store, &config, &requests, Utc::now()).await?;

            let rejected: Vec<Value> = report
                .rejected
                .iter()
                .map(|(index, reason)| json!({"index": index, "reason": reason.to_string()}))
                .collect();
            let rejected_count = rejected.len();
            print_json(&json!({"added": report.added, "rejected": rejected}))?;
            if rejected_count > 0 {
                return Err(anyhow!("{rejected_count} notice(s) were invalid and not added"));
            }
            Ok(())
        }
        Commands::SlackAlert { event } => {
            let event = read_json(&event)?;
            let relay = build_alert_relay(config_path).await?;
            tracing::info!(command = "slack-alert", "Relaying alert");
            let response = relay.handle(&event).await?;
            print_json(&response)
        }
        Commands::Lambda { function } => serve(function, config_path).await,
    }
}
