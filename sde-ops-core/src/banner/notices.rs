//! Operator-authored portal banners.
//!
//! Requests come from a JSON file; each one is validated on its own and
//! written if it passes. Rejected requests are reported back rather than
//! aborting the batch, but a failed write stops the batch immediately. The
//! notices table is checked for access before any request is looked at.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{localise, notice_id, put_notice, BannerError};
use crate::config::BannerConfig;
use crate::contract::{Notice, NoticeStore};

/// Colours the portal knows how to render.
pub const BANNER_COLOURS: [&str; 3] = ["blue", "red", "yellow"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// One banner as written by an operator. Every field is optional so that a
/// partially filled request can be reported rather than failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoticeRequest {
    pub notification: Option<String>,
    pub colour: Option<String>,
    pub start_period: Option<String>,
    pub expiry_period: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NoticeRejection {
    #[error("notification text is missing")]
    MissingNotification,
    #[error("colour is missing")]
    MissingColour,
    #[error("colour {0:?} is not valid, pick one of blue, red or yellow")]
    InvalidColour(String),
    #[error("start period is missing")]
    MissingStart,
    #[error("expiry period is missing")]
    MissingExpiry,
    #[error("{0:?} could not be converted into a date")]
    UnparseableDate(String),
    #[error("the start date provided ({0}) occurs before the current time")]
    StartInPast(DateTime<Utc>),
    #[error("the expiry date ({expiry}) must occur after the start date ({start})")]
    ExpiryNotAfterStart {
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    },
}

/// Outcome of a batch of notice requests.
#[derive(Debug, Default)]
pub struct NoticeReport {
    pub added: Vec<Notice>,
    /// Position in the batch (0-based) and reason for each rejected request.
    pub rejected: Vec<(usize, NoticeRejection)>,
}

/// Parse an operator-supplied time. RFC 3339 values carry their own offset;
/// anything else is read as wall-clock time in `timezone`.
pub fn parse_notice_time(value: &str, timezone: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })?;
    localise(timezone, naive)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

impl NoticeRequest {
    /// Check the request against `now` and build the notice to store.
    pub fn validate(
        &self,
        now: DateTime<Utc>,
        timezone: Tz,
        notice_id: String,
    ) -> Result<Notice, NoticeRejection> {
        let notification = self
            .notification
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .ok_or(NoticeRejection::MissingNotification)?;

        let colour = self.colour.as_deref().ok_or(NoticeRejection::MissingColour)?;
        if !BANNER_COLOURS.contains(&colour) {
            return Err(NoticeRejection::InvalidColour(colour.to_string()));
        }

        let parse = |value: &str| {
            parse_notice_time(value, timezone)
                .ok_or_else(|| NoticeRejection::UnparseableDate(value.to_string()))
        };

        let start = parse(self.start_period.as_deref().ok_or(NoticeRejection::MissingStart)?)?;
        if start <= now {
            return Err(NoticeRejection::StartInPast(start));
        }

        let expiry = parse(self.expiry_period.as_deref().ok_or(NoticeRejection::MissingExpiry)?)?;
        if expiry <= start {
            return Err(NoticeRejection::ExpiryNotAfterStart { start, expiry });
        }

        Ok(Notice {
            notice_id,
            notification: notification.to_string(),
            start_period: start.timestamp(),
            expiry_period: expiry.timestamp(),
            colour: colour.to_string(),
        })
    }
}

/// Validate and write each request in turn.
pub async fn add_notices<N>(
    store: &N,
    config: &BannerConfig,
    requests: &[NoticeRequest],
    now: DateTime<Utc>,
) -> Result<NoticeReport, BannerError>
where
    N: NoticeStore + ?Sized,
{
    info!(count = requests.len(), "[BANNER] Adding portal banner notices");
    store
        .check_access(&config.notices_table)
        .await
        .map_err(|source| {
            error!(error = ?source, table = %config.notices_table, "[BANNER][ERROR] Notices table is not accessible");
            BannerError::Access {
                table: config.notices_table.clone(),
                source,
            }
        })?;

    let base_id = notice_id(now);
    let mut report = NoticeReport::default();

    for (index, request) in requests.iter().enumerate() {
        let id = if index == 0 {
            base_id.clone()
        } else {
            format!("{base_id}_{index}")
        };
        match request.validate(now, config.timezone, id) {
            Ok(notice) => {
                put_notice(store, &config.notices_table, &notice).await?;
                report.added.push(notice);
            }
            Err(rejection) => {
                warn!(index, reason = %rejection, "[BANNER] Skipping invalid notice");
                report.rejected.push((index, rejection));
            }
        }
    }

    info!(
        added = report.added.len(),
        rejected = report.rejected.len(),
        "[BANNER] Finished adding notices"
    );
    Ok(report)
}
