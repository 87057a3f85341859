use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudwatchlogs::Client;
use sde_ops_core::contract::{LogEvent, LogQuery, MetricFilter, ServiceError};
use tracing::debug;

/// [`LogQuery`] backed by CloudWatch Logs.
pub struct CloudWatchLogQuery {
    client: Client,
}

impl CloudWatchLogQuery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl LogQuery for CloudWatchLogQuery {
    async fn describe_metric_filters(
        &self,
        namespace: &str,
        metric_name: &str,
    ) -> Result<Vec<MetricFilter>, ServiceError> {
        let output = self
            .client
            .describe_metric_filters()
            .metric_namespace(namespace)
            .metric_name(metric_name)
            .send()
            .await?;

        let filters: Vec<MetricFilter> = output
            .metric_filters()
            .iter()
            .filter_map(|filter| {
                Some(MetricFilter {
                    log_group_name: filter.log_group_name()?.to_string(),
                    filter_pattern: filter.filter_pattern().unwrap_or_default().to_string(),
                })
            })
            .collect();
        debug!(namespace, metric_name, count = filters.len(), "Described metric filters");
        Ok(filters)
    }

    async fn filter_log_events(
        &self,
        log_group: &str,
        pattern: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<LogEvent>, ServiceError> {
        let output = self
            .client
            .filter_log_events()
            .log_group_name(log_group)
            .filter_pattern(pattern)
            .start_time(start_ms)
            .end_time(end_ms)
            .send()
            .await?;

        let events: Vec<LogEvent> = output
            .events()
            .iter()
            .map(|event| LogEvent {
                timestamp_ms: event.timestamp(),
                message: event.message().map(str::to_string),
            })
            .collect();
        debug!(log_group, count = events.len(), "Filtered log events");
        Ok(events)
    }
}
