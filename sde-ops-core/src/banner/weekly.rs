//! The weekly maintenance banner.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use tracing::info;

use super::{localise, notice_id, put_notice, BannerError};
use crate::config::BannerConfig;
use crate::contract::{Notice, NoticeStore};

pub const WEEKLY_NOTIFICATION: &str = "The Platform is currently undergoing its weekly maintenance update and is unavailable until 09:00hrs\n\nRegular weekly maintenance updates are carried out between 7am and 9am on Wednesdays";

pub const WEEKLY_COLOUR: &str = "yellow";

const MAINTENANCE_DAY: Weekday = Weekday::Wed;
const START_HOUR: i64 = 7;
const END_HOUR: i64 = 9;

/// Start and end of the next maintenance window on or after `now`'s local date.
pub fn maintenance_window(
    now: DateTime<Utc>,
    timezone: Tz,
) -> Result<(DateTime<Tz>, DateTime<Tz>), BannerError> {
    let local = now.with_timezone(&timezone);
    let days_until = (i64::from(MAINTENANCE_DAY.num_days_from_monday())
        - i64::from(local.weekday().num_days_from_monday()))
    .rem_euclid(7);
    let date = local.date_naive() + Duration::days(days_until);

    let at = |hour: i64| localise(timezone, date.and_time(NaiveTime::MIN) + Duration::hours(hour));
    Ok((at(START_HOUR)?, at(END_HOUR)?))
}

/// The notice for the next maintenance window.
pub fn weekly_notice(now: DateTime<Utc>, timezone: Tz) -> Result<Notice, BannerError> {
    let (start, end) = maintenance_window(now, timezone)?;
    info!(
        start_period = %start,
        expiry_period = %end,
        "Calculated start_period and expiry_period"
    );
    Ok(Notice {
        notice_id: notice_id(now),
        notification: WEEKLY_NOTIFICATION.to_string(),
        start_period: start.timestamp(),
        expiry_period: end.timestamp(),
        colour: WEEKLY_COLOUR.to_string(),
    })
}

/// Write the weekly maintenance banner into the notices table.
pub async fn add_weekly_banner<N>(
    store: &N,
    config: &BannerConfig,
    now: DateTime<Utc>,
) -> Result<Notice, BannerError>
where
    N: NoticeStore + ?Sized,
{
    info!(table = %config.notices_table, "[BANNER] Creating weekly banner in notices table");
    let notice = weekly_notice(now, config.timezone)?;
    put_notice(store, &config.notices_table, &notice).await?;
    info!(notice_id = %notice.notice_id, "[BANNER] Successfully created weekly banner");
    Ok(notice)
}
