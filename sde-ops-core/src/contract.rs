//! # contract: interfaces to the external services
//!
//! Each handler in this crate talks to the outside world only through the
//! traits below. Production implementations wrap the AWS SDK clients and an
//! HTTP client (see the `sde-ops` crate); tests use the `Mock*` types that
//! `mockall` generates for every trait.
//!
//! ## Error handling
//! - All methods return [`ServiceError`], a boxed `Send + Sync` error.
//! - Handlers never inspect the error beyond logging it: a failed call is
//!   mapped onto the handler's own error or response.
//!
//! ## Mocking & Testing
//! - Mocks are exported when the `test-export-mocks` feature is enabled (the
//!   default), so integration tests under `tests/` can build them.

#![allow(unused)]

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Boxed error returned by every external service call.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a server-side object copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReceipt {
    /// ETag of the new object. Absent when the store did not confirm the copy.
    pub e_tag: Option<String>,
}

impl CopyReceipt {
    pub fn confirmed(e_tag: impl Into<String>) -> Self {
        Self {
            e_tag: Some(e_tag.into()),
        }
    }

    /// A copy only counts as done when the store handed back a non-empty ETag.
    pub fn is_confirmed(&self) -> bool {
        self.e_tag.as_deref().is_some_and(|tag| !tag.is_empty())
    }
}

/// An HTML email ready to hand to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub source: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// A portal banner as stored in the notices table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub notice_id: String,
    /// Markdown text shown in the banner.
    pub notification: String,
    /// UNIX seconds from which the banner is shown.
    pub start_period: i64,
    /// UNIX seconds after which the banner is hidden.
    pub expiry_period: i64,
    pub colour: String,
}

/// The parts of a CloudWatch Logs metric filter the alert relay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricFilter {
    pub log_group_name: String,
    pub filter_pattern: String,
}

/// A single log event returned by a filtered log query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Milliseconds since the UNIX epoch.
    pub timestamp_ms: Option<i64>,
    pub message: Option<String>,
}

/// Object storage (S3 in production).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object into memory.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ServiceError>;

    /// Server-side copy of `source_bucket/source_key` to `target_bucket/target_key`.
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<CopyReceipt, ServiceError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ServiceError>;

    /// Keys of all objects in `bucket` starting with `prefix`.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ServiceError>;
}

/// Outbound email (SES in production).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}

/// The portal's notices table (DynamoDB in production).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait NoticeStore: Send + Sync {
    /// Fails when the caller cannot reach `table`.
    async fn check_access(&self, table: &str) -> Result<(), ServiceError>;

    async fn put_notice(&self, table: &str, notice: &Notice) -> Result<(), ServiceError>;
}

/// Read access to CloudWatch Logs metric filters and log events.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LogQuery: Send + Sync {
    async fn describe_metric_filters(
        &self,
        namespace: &str,
        metric_name: &str,
    ) -> Result<Vec<MetricFilter>, ServiceError>;

    /// Events in `log_group` matching `pattern` between the two timestamps (milliseconds).
    async fn filter_log_events(
        &self,
        log_group: &str,
        pattern: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<LogEvent>, ServiceError>;
}

/// A chat incoming-webhook (Slack in production).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ChatWebhook: Send + Sync {
    /// Post a JSON payload, returning the HTTP status code of the response.
    async fn post(&self, payload: &serde_json::Value) -> Result<u16, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_receipt_requires_non_empty_etag() {
        assert!(CopyReceipt::confirmed("\"abc\"").is_confirmed());
        assert!(!CopyReceipt::confirmed("").is_confirmed());
        assert!(!CopyReceipt::default().is_confirmed());
    }
}
