//! Calendar-day boundaries for segment time windows.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Offset, Utc};

use super::plan::TimeWindow;
use crate::db::CreatedRange;

/// Text format of `topics.created_at`.
const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Midnights (expressed in UTC) that split topics into days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundaries {
    pub today_start: NaiveDateTime,
    pub yesterday_start: NaiveDateTime,
    pub day_before_yesterday_start: NaiveDateTime,
}

impl DayBoundaries {
    /// Boundaries for the calendar day containing `now` in the given offset.
    #[must_use]
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local_midnight = now
            .with_timezone(&offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let today_start =
            local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));

        Self {
            today_start,
            yesterday_start: today_start - Duration::days(1),
            day_before_yesterday_start: today_start - Duration::days(2),
        }
    }

    /// Creation-time range covered by a window.
    #[must_use]
    pub fn range(&self, window: TimeWindow) -> CreatedRange {
        match window {
            TimeWindow::Today => CreatedRange {
                from: Some(to_sql_timestamp(self.today_start)),
                until: None,
            },
            TimeWindow::Yesterday => CreatedRange {
                from: Some(to_sql_timestamp(self.yesterday_start)),
                until: Some(to_sql_timestamp(self.today_start)),
            },
            TimeWindow::BeforeYesterday => CreatedRange {
                from: None,
                until: Some(to_sql_timestamp(self.yesterday_start)),
            },
            TimeWindow::BeforeDayBeforeYesterday => CreatedRange {
                from: None,
                until: Some(to_sql_timestamp(self.day_before_yesterday_start)),
            },
        }
    }
}

/// UTC offset for `minutes` east of UTC, falling back to UTC when out of range.
#[must_use]
pub fn utc_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Format a UTC timestamp the way SQLite's `datetime()` does.
#[must_use]
pub fn to_sql_timestamp(t: NaiveDateTime) -> String {
    t.format(SQL_TIMESTAMP_FORMAT).to_string()
}
