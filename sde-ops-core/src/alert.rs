//! # alert: relay CloudWatch alarms and ECS task events to Slack
//!
//! Alarms reach the relay through SNS. The relay turns the SNS message into
//! Slack "blocks" and posts them to an incoming webhook.
//!
//! - ECS task state changes become four fixed sections.
//! - Alarms raised by a log metric filter are enriched with the latest log
//!   events matching the filter in the 30 seconds before the alarm fired.
//! - Any other alarm is described from the alarm payload alone.
//!
//! Lookups against CloudWatch Logs are best effort: a failed lookup is logged
//! and treated as "nothing found". Only a failed or rejected webhook post is
//! an error.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::config::AlertConfig;
use crate::contract::{ChatWebhook, LogEvent, LogQuery, MetricFilter, ServiceError};

/// Sent by SES when an SNS topic is first attached; carries no alarm.
pub const SNS_VALIDATION_MESSAGE: &str =
    "Successfully validated SNS topic for Amazon SES event publishing.";

pub const ECS_TASK_STATE_CHANGE: &str = "ECS Task State Change";

/// How far before the alarm to look for matching log events.
pub const ERROR_EVENT_TIME_WINDOW_SECS: i64 = 30;

/// Slack rejects messages with more blocks than this.
pub const MAX_SLACK_CONTENT_BLOCKS: usize = 50;

const LATEST_EVENT_COUNT: usize = 3;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("event does not contain an SNS message")]
    MissingMessage,
    #[error("SNS message is not valid JSON")]
    InvalidMessage(#[source] serde_json::Error),
    #[error("ECS task state change is missing {0}")]
    MissingEcsField(&'static str),
    #[error("alarm StateChangeTime {0:?} is not a valid timestamp")]
    InvalidStateChangeTime(String),
    #[error("Post to slack failed")]
    Post(#[source] ServiceError),
    #[error("Post to slack failed with status {0}")]
    UnexpectedStatus(u16),
}

/// A Slack `section` block holding markdown text.
pub fn markdown_section(text: impl Into<String>) -> Value {
    json!({"type": "section", "text": {"type": "mrkdwn", "text": text.into()}})
}

pub fn divider() -> Value {
    json!({"type": "divider"})
}

/// Text for an alarm field: strings as-is, missing values as `None`.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Cap the message at [`MAX_SLACK_CONTENT_BLOCKS`], replacing the tail with a notice.
pub fn truncate_blocks(mut blocks: Vec<Value>) -> Vec<Value> {
    if blocks.len() > MAX_SLACK_CONTENT_BLOCKS {
        blocks.truncate(MAX_SLACK_CONTENT_BLOCKS - 1);
        blocks.push(markdown_section("Exceeded max message length"));
    }
    blocks
}

pub fn ecs_state_change_blocks(message: &Value) -> Result<Vec<Value>, AlertError> {
    let field = |pointer: &str, name: &'static str| {
        message
            .pointer(pointer)
            .map(|value| field_text(Some(value)))
            .ok_or(AlertError::MissingEcsField(name))
    };
    Ok(vec![
        markdown_section(format!("*Detail:* {}", field("/detail-type", "detail-type")?)),
        markdown_section(format!("*Group:* {}", field("/detail/group", "detail.group")?)),
        markdown_section(format!(
            "*Desired Status:* {}",
            field("/detail/desiredStatus", "detail.desiredStatus")?
        )),
        markdown_section(format!(
            "*Reason:* {}",
            field("/detail/stoppedReason", "detail.stoppedReason")?
        )),
    ])
}

/// Blocks for an alarm with no log metric filter behind it.
pub fn alarm_summary_blocks(message: &Value) -> Vec<Value> {
    let mut blocks = vec![
        markdown_section(format!("*Alarm name:* {}", field_text(message.get("AlarmName")))),
        markdown_section(format!(
            "*Alarm description:* {}",
            field_text(message.get("AlarmDescription"))
        )),
        markdown_section(format!("*Time:* {}", field_text(message.get("StateChangeTime")))),
        markdown_section(format!("*Reason:* {}", field_text(message.get("NewStateReason")))),
    ];

    let trigger = match message.get("Trigger").and_then(Value::as_object) {
        Some(trigger) if !trigger.is_empty() => trigger,
        _ => return blocks,
    };

    blocks.push(markdown_section(format!(
        "*Namespace:* {}",
        field_text(trigger.get("Namespace"))
    )));
    if let Some(dimension) = trigger
        .get("Dimensions")
        .and_then(Value::as_array)
        .and_then(|dimensions| dimensions.first())
    {
        blocks.push(markdown_section(format!(
            "*{}:* {}",
            field_text(dimension.get("name")),
            field_text(dimension.get("value"))
        )));
    }
    blocks.push(markdown_section(format!(
        "*Metric name:* {}",
        field_text(trigger.get("MetricName"))
    )));
    blocks
}

/// Slack link to the log group in the CloudWatch console.
pub fn log_group_link(region: &str, log_group: &str) -> String {
    format!(
        "<https://{region}.console.aws.amazon.com/cloudwatch/home?region={region}#logStream:group={log_group}|{log_group}>"
    )
}

/// ISO 8601 in UTC without an offset; fractional seconds only when non-zero.
fn event_timestamp(timestamp_ms: Option<i64>) -> String {
    match timestamp_ms.and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(time) if time.timestamp_subsec_micros() == 0 => {
            time.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()
        }
        Some(time) => time.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        None => "None".to_string(),
    }
}

/// Blocks for one log event: a divider, the timestamp, then the message.
pub fn log_event_blocks(event: &LogEvent) -> Vec<Value> {
    let mut blocks = vec![
        divider(),
        markdown_section(format!("*Timestamp:* {}", event_timestamp(event.timestamp_ms))),
    ];

    let message = event.message.as_deref();
    match message.and_then(|text| serde_json::from_str::<Value>(text).ok()) {
        Some(Value::Object(fields)) => {
            let mut fields: Vec<_> = fields.into_iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            blocks.extend(
                fields
                    .iter()
                    .map(|(key, value)| markdown_section(format!("*{key}:* {}", field_text(Some(value))))),
            );
        }
        _ => blocks.push(markdown_section(format!(
            "*Message:* {}",
            message.unwrap_or("None")
        ))),
    }
    blocks
}

/// Parse `StateChangeTime`, e.g. `2024-01-23T16:00:00.000+0000`.
pub fn parse_state_change_time(value: &str) -> Result<DateTime<Utc>, AlertError> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| AlertError::InvalidStateChangeTime(value.to_string()))
}

/// The relay with its clients injected.
pub struct AlertRelay<L, W> {
    logs: L,
    webhook: W,
    config: AlertConfig,
}

impl<L, W> AlertRelay<L, W>
where
    L: LogQuery,
    W: ChatWebhook,
{
    pub fn new(logs: L, webhook: W, config: AlertConfig) -> Self {
        Self {
            logs,
            webhook,
            config,
        }
    }

    /// Handle one SNS event, posting to Slack unless it is the SES validation message.
    pub async fn handle(&self, event: &Value) -> Result<Value, AlertError> {
        let raw = event
            .pointer("/Records/0/Sns/Message")
            .and_then(Value::as_str)
            .ok_or(AlertError::MissingMessage)?;
        let message: Value = serde_json::from_str(raw).map_err(AlertError::InvalidMessage)?;

        if message.as_str() == Some(SNS_VALIDATION_MESSAGE) {
            info!("[ALERT] Sns validation event, no action required.");
            return Ok(json!({"message": "Sns validation event, no action required."}));
        }

        info!("[ALERT] Sending error details to slack");
        let blocks = truncate_blocks(self.message_blocks(&message).await?);

        info!(blocks = blocks.len(), "[ALERT] Posting message to Slack");
        let status = self
            .webhook
            .post(&json!({ "blocks": blocks }))
            .await
            .map_err(|e| {
                error!(error = ?e, "[ALERT][ERROR] Post to slack failed");
                AlertError::Post(e)
            })?;
        if status != 200 {
            error!(status, "[ALERT][ERROR] Unexpected response from slack, bailing");
            return Err(AlertError::UnexpectedStatus(status));
        }

        info!(status, "[ALERT] Successfully notified slack");
        Ok(json!({ "status": status }))
    }

    /// Build the Slack blocks for a decoded SNS message.
    pub async fn message_blocks(&self, message: &Value) -> Result<Vec<Value>, AlertError> {
        if message.get("detail-type").and_then(Value::as_str) == Some(ECS_TASK_STATE_CHANGE) {
            return ecs_state_change_blocks(message);
        }

        let filters = self.metric_filters(message.get("Trigger")).await;
        let filter = match filters.into_iter().next() {
            Some(filter) => filter,
            None => {
                info!("[ALERT] Could not find metric filter for trigger");
                return Ok(alarm_summary_blocks(message));
            }
        };

        let mut blocks = vec![markdown_section(format!(
            "*Log group:* {}",
            log_group_link(&self.config.aws_region, &filter.log_group_name)
        ))];

        let end = parse_state_change_time(&field_text(message.get("StateChangeTime")))?;
        let start = end - Duration::seconds(ERROR_EVENT_TIME_WINDOW_SECS);
        info!(
            log_group = %filter.log_group_name,
            window_secs = ERROR_EVENT_TIME_WINDOW_SECS,
            "[ALERT] Getting matching events preceding alarm"
        );
        let events = self
            .logs
            .filter_log_events(
                &filter.log_group_name,
                &filter.filter_pattern,
                start.timestamp_millis(),
                end.timestamp_millis(),
            )
            .await
            .unwrap_or_else(|e| {
                error!(error = ?e, "[ALERT] Error getting log entries, continuing");
                Vec::new()
            });

        if events.is_empty() {
            info!("[ALERT] Could not find matching log entries");
            blocks.push(markdown_section("*Could not find matching log entries*"));
            return Ok(blocks);
        }

        blocks.push(markdown_section(format!(
            "*Matching events from the last {ERROR_EVENT_TIME_WINDOW_SECS} seconds*"
        )));
        for event in events.iter().rev().take(LATEST_EVENT_COUNT) {
            blocks.extend(log_event_blocks(event));
        }
        Ok(blocks)
    }

    async fn metric_filters(&self, trigger: Option<&Value>) -> Vec<MetricFilter> {
        let namespace = trigger.and_then(|t| t.get("Namespace")).and_then(Value::as_str);
        let metric_name = trigger.and_then(|t| t.get("MetricName")).and_then(Value::as_str);
        let (Some(namespace), Some(metric_name)) = (namespace, metric_name) else {
            return Vec::new();
        };

        info!(namespace, metric_name, "[ALERT] Getting metric filter details");
        self.logs
            .describe_metric_filters(namespace, metric_name)
            .await
            .unwrap_or_else(|e| {
                info!(error = ?e, "[ALERT] Found no metric filters, continuing");
                Vec::new()
            })
    }
}
