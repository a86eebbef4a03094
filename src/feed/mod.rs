//! Structured home feed.
//!
//! A feed request runs three stages: [`plan::plan_segments`] turns the page
//! size into per-segment quotas, [`fetch`] reads each segment from a
//! [`TopicStore`], and [`assemble::assemble`] merges the results into a
//! deduplicated pool and slices out the requested page. Nothing is cached
//! between requests.

mod assemble;
mod error;
mod fetch;
mod plan;
mod store;
mod window;

pub use assemble::{assemble, build_pool, FeedItem, FeedPage, Pagination};
pub use error::FeedError;
pub use fetch::{fetch_concurrent, fetch_segment, fetch_sequential, SegmentOutcome, SegmentResult};
pub use plan::{plan_segments, SegmentKind, SegmentPlan, SegmentRule, Shares, TimeWindow, SEGMENT_RULES};
pub use store::TopicStore;
pub use window::{to_sql_timestamp, utc_offset, DayBoundaries};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use crate::config::{Config, FetchStrategy};

/// Tunables for feed construction.
#[derive(Debug, Clone, Copy)]
pub struct FeedSettings {
    pub max_limit: u32,
    pub segment_timeout: Duration,
    pub fetch_strategy: FetchStrategy,
    pub utc_offset: FixedOffset,
}

impl FeedSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_limit: config.feed_max_limit,
            segment_timeout: config.segment_timeout,
            fetch_strategy: config.fetch_strategy,
            utc_offset: utc_offset(config.utc_offset_minutes),
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_limit: 100,
            segment_timeout: Duration::from_secs(2),
            fetch_strategy: FetchStrategy::Sequential,
            utc_offset: utc_offset(0),
        }
    }
}

/// Builds feed pages from a topic store.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn TopicStore>,
    settings: FeedSettings,
}

impl FeedService {
    pub fn new(store: Arc<dyn TopicStore>, settings: FeedSettings) -> Self {
        Self { store, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Check that the underlying store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store's error if it is not.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.store.ping().await
    }

    /// Build page `page` of the feed, `limit` topics per page, as of now.
    ///
    /// # Errors
    ///
    /// See [`FeedService::build_feed_at`].
    pub async fn build_feed(&self, page: u32, limit: u32) -> Result<FeedPage, FeedError> {
        self.build_feed_at(page, limit, Utc::now()).await
    }

    /// Build a feed page with day boundaries derived from `now`.
    ///
    /// # Errors
    ///
    /// Returns a client error for a zero page, a zero limit or a limit above
    /// the configured maximum, and [`FeedError::StoreUnavailable`] when every
    /// queried segment failed.
    pub async fn build_feed_at(
        &self,
        page: u32,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<FeedPage, FeedError> {
        if page == 0 {
            return Err(FeedError::InvalidPage);
        }
        if limit > self.settings.max_limit {
            return Err(FeedError::PageSizeTooLarge {
                max: self.settings.max_limit,
            });
        }

        let plans = plan_segments(limit)?;
        let bounds = DayBoundaries::at(now, self.settings.utc_offset);
        let store = self.store.as_ref();
        let timeout = self.settings.segment_timeout;

        let results = match self.settings.fetch_strategy {
            FetchStrategy::Sequential => fetch_sequential(store, &plans, &bounds, timeout).await,
            FetchStrategy::Concurrent => fetch_concurrent(store, &plans, &bounds, timeout).await,
        };

        let feed = assemble(&results, page, limit)?;

        info!(
            page,
            limit,
            returned = feed.data.len(),
            pool = feed.pagination.total_topics,
            degraded = feed.degraded_segments.len(),
            "Built feed page"
        );

        Ok(feed)
    }
}
