//! Bucket planning: how many topics each feed segment may contribute.
//!
//! A page is split into a recent share (90%) and a historical share (10%).
//! The recent share is split again into today (60% of the page) and
//! yesterday (the rest of the recent share). Each of those shares is then
//! divided between the segments listed in [`SEGMENT_RULES`], in priority
//! order. All divisions floor, and a short segment never borrows from
//! another one.

use std::fmt;

use serde::Serialize;

use super::FeedError;
use crate::db::TopicOrder;

/// Creation-time window a segment draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Created since today's midnight.
    Today,
    /// Created between yesterday's midnight and today's.
    Yesterday,
    /// Created before yesterday's midnight.
    BeforeYesterday,
    /// Created before the midnight that started the day before yesterday.
    BeforeDayBeforeYesterday,
}

/// The seven feed segments, declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    TodayPopular,
    TodayOther,
    YesterdayPopular,
    YesterdayLessPopular,
    /// Old topics with the highest scores, shown in the yesterday share.
    PastSuperPopular,
    HistoricalLessPopular,
    HistoricalOther,
}

impl SegmentKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TodayPopular => "today_popular",
            Self::TodayOther => "today_other",
            Self::YesterdayPopular => "yesterday_popular",
            Self::YesterdayLessPopular => "yesterday_less_popular",
            Self::PastSuperPopular => "past_super_popular",
            Self::HistoricalLessPopular => "historical_less_popular",
            Self::HistoricalOther => "historical_other",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intermediate page shares the segment quotas are carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shares {
    pub recent: u64,
    pub today: u64,
    pub yesterday: u64,
    pub historical: u64,
}

impl Shares {
    #[must_use]
    pub fn split(page_size: u32) -> Self {
        let page_size = u64::from(page_size);
        let recent = page_size * 9 / 10;
        let today = recent * 6 / 10;
        Self {
            recent,
            today,
            yesterday: recent - today,
            historical: page_size - recent,
        }
    }
}

/// One row of the segment table.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRule {
    pub kind: SegmentKind,
    pub window: TimeWindow,
    pub order: TopicOrder,
    pub quota: fn(&Shares) -> u64,
}

/// Segment table in priority order. Earlier rows win when the same topic
/// qualifies for several segments.
pub const SEGMENT_RULES: [SegmentRule; 7] = [
    SegmentRule {
        kind: SegmentKind::TodayPopular,
        window: TimeWindow::Today,
        order: TopicOrder::PopularityDesc,
        quota: today_popular_quota,
    },
    SegmentRule {
        kind: SegmentKind::TodayOther,
        window: TimeWindow::Today,
        order: TopicOrder::PopularityAsc,
        quota: today_other_quota,
    },
    SegmentRule {
        kind: SegmentKind::YesterdayPopular,
        window: TimeWindow::Yesterday,
        order: TopicOrder::PopularityDesc,
        quota: yesterday_popular_quota,
    },
    SegmentRule {
        kind: SegmentKind::YesterdayLessPopular,
        window: TimeWindow::Yesterday,
        order: TopicOrder::PopularityAsc,
        quota: yesterday_less_popular_quota,
    },
    SegmentRule {
        kind: SegmentKind::PastSuperPopular,
        window: TimeWindow::BeforeYesterday,
        order: TopicOrder::PopularityDesc,
        quota: past_super_popular_quota,
    },
    SegmentRule {
        kind: SegmentKind::HistoricalLessPopular,
        window: TimeWindow::BeforeDayBeforeYesterday,
        order: TopicOrder::PopularityAsc,
        quota: historical_less_popular_quota,
    },
    SegmentRule {
        kind: SegmentKind::HistoricalOther,
        window: TimeWindow::BeforeDayBeforeYesterday,
        order: TopicOrder::Recency,
        quota: historical_other_quota,
    },
];

fn today_popular_quota(s: &Shares) -> u64 {
    s.today / 10
}

fn today_other_quota(s: &Shares) -> u64 {
    s.today - today_popular_quota(s)
}

fn yesterday_popular_quota(s: &Shares) -> u64 {
    s.yesterday * 20 / 30
}

fn yesterday_less_popular_quota(s: &Shares) -> u64 {
    s.yesterday * 5 / 30
}

fn past_super_popular_quota(s: &Shares) -> u64 {
    s.yesterday - yesterday_popular_quota(s) - yesterday_less_popular_quota(s)
}

fn historical_less_popular_quota(s: &Shares) -> u64 {
    s.historical * 4 / 10
}

fn historical_other_quota(s: &Shares) -> u64 {
    s.historical - historical_less_popular_quota(s)
}

/// A segment with its quota resolved for one page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlan {
    pub kind: SegmentKind,
    pub window: TimeWindow,
    pub order: TopicOrder,
    pub quota: u32,
}

/// Resolve every segment's quota for `page_size`.
///
/// # Errors
///
/// Returns [`FeedError::InvalidPageSize`] when `page_size` is zero.
pub fn plan_segments(page_size: u32) -> Result<Vec<SegmentPlan>, FeedError> {
    if page_size == 0 {
        return Err(FeedError::InvalidPageSize);
    }

    let shares = Shares::split(page_size);
    Ok(SEGMENT_RULES
        .iter()
        .map(|rule| SegmentPlan {
            kind: rule.kind,
            window: rule.window,
            order: rule.order,
            // Every quota is a fraction of page_size, so it fits in u32.
            quota: (rule.quota)(&shares) as u32,
        })
        .collect())
}
