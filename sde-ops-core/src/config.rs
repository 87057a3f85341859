use chrono_tz::Tz;
use tracing::{debug, info};

/// Objects smaller than this cannot hold a header and a data row.
pub const MIN_OBJECT_SIZE_BYTES: i64 = 3;

pub const DEFAULT_MAX_OBJECT_SIZE_BYTES: i64 = 1_048_576;

/// Every imported file must carry this extension.
pub const REQUIRED_EXTENSION: &str = ".csv";

pub const DEFAULT_SUPPORT_EMAIL_ADDRESS: &str = "england.sde.input-checks@nhs.net";

pub const DEFAULT_BANNER_TIMEZONE: Tz = chrono_tz::Europe::London;

pub const DEFAULT_AWS_REGION: &str = "eu-west-2";

/// Settings for the data-in forwarder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Bucket receiving files that passed validation.
    pub pending_bucket: String,
    /// Bucket receiving files that failed validation.
    pub rejected_bucket: String,
    /// Sender address for notification emails.
    pub source_email: String,
    pub max_object_size_bytes: i64,
    /// Address users are told to contact to replace a file still being processed.
    pub support_email: String,
}

impl ForwarderConfig {
    pub fn new(
        pending_bucket: impl Into<String>,
        rejected_bucket: impl Into<String>,
        source_email: impl Into<String>,
    ) -> Self {
        Self {
            pending_bucket: pending_bucket.into(),
            rejected_bucket: rejected_bucket.into(),
            source_email: source_email.into(),
            max_object_size_bytes: DEFAULT_MAX_OBJECT_SIZE_BYTES,
            support_email: DEFAULT_SUPPORT_EMAIL_ADDRESS.to_string(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            pending_bucket = %self.pending_bucket,
            rejected_bucket = %self.rejected_bucket,
            max_object_size_bytes = self.max_object_size_bytes,
            "Loaded ForwarderConfig"
        );
        debug!(?self, "ForwarderConfig loaded (full debug)");
    }
}

/// Settings for writing portal banners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerConfig {
    pub notices_table: String,
    /// Zone in which banner times are expressed.
    pub timezone: Tz,
}

impl BannerConfig {
    pub fn new(notices_table: impl Into<String>) -> Self {
        Self {
            notices_table: notices_table.into(),
            timezone: DEFAULT_BANNER_TIMEZONE,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            notices_table = %self.notices_table,
            timezone = %self.timezone,
            "Loaded BannerConfig"
        );
    }
}

/// Settings for relaying alarms to Slack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    pub slack_hook_url: String,
    /// Region used to build CloudWatch console links.
    pub aws_region: String,
}

impl AlertConfig {
    pub fn trace_loaded(&self) {
        // Never log the hook URL itself.
        info!(
            aws_region = %self.aws_region,
            slack_hook_url_len = self.slack_hook_url.len(),
            "Loaded AlertConfig"
        );
    }
}
