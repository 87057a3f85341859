//! Portal banners stored in the notices table.
//!
//! - [`weekly`]: the recurring Wednesday maintenance banner, written by a scheduled function.
//! - [`notices`]: operator-authored banners loaded from a JSON file.
//!
//! Both end in [`NoticeStore::put_notice`]; the portal shows a banner while
//! the current time is between its start and expiry periods.

pub mod notices;
pub mod weekly;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{error, info};

use crate::contract::{Notice, NoticeStore, ServiceError};

pub use notices::{add_notices, NoticeRejection, NoticeReport, NoticeRequest};
pub use weekly::{add_weekly_banner, maintenance_window, weekly_notice};

#[derive(Debug, Error)]
pub enum BannerError {
    #[error("unable to interact with table {table}, check your permissions")]
    Access {
        table: String,
        #[source]
        source: ServiceError,
    },
    #[error("failed to write notice {notice_id} to table {table}")]
    Store {
        table: String,
        notice_id: String,
        #[source]
        source: ServiceError,
    },
    #[error("local time {time} does not exist in {timezone}")]
    NonexistentLocalTime { time: NaiveDateTime, timezone: Tz },
}

/// `noticeId_<unix seconds>`, rounded to the nearest second.
pub fn notice_id(now: DateTime<Utc>) -> String {
    format!("noticeId_{}", (now.timestamp_millis() + 500).div_euclid(1000))
}

/// Interpret a wall-clock time in `timezone`, taking the earlier instant when
/// the time is repeated by a DST change.
pub fn localise(timezone: Tz, time: NaiveDateTime) -> Result<DateTime<Tz>, BannerError> {
    timezone
        .from_local_datetime(&time)
        .earliest()
        .ok_or(BannerError::NonexistentLocalTime { time, timezone })
}

pub(crate) async fn put_notice<N>(store: &N, table: &str, notice: &Notice) -> Result<(), BannerError>
where
    N: NoticeStore + ?Sized,
{
    info!(
        table = %table,
        notice_id = %notice.notice_id,
        start_period = notice.start_period,
        expiry_period = notice.expiry_period,
        colour = %notice.colour,
        "[BANNER] Writing notice"
    );
    store.put_notice(table, notice).await.map_err(|source| {
        error!(error = ?source, notice_id = %notice.notice_id, "[BANNER][ERROR] Failed to write notice");
        BannerError::Store {
            table: table.to_string(),
            notice_id: notice.notice_id.clone(),
            source,
        }
    })
}
