//! Segment fetching against a [`TopicStore`].

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use super::plan::SegmentPlan;
use super::store::TopicStore;
use super::window::DayBoundaries;
use crate::db::{FeedTopic, TopicQuery};

/// What a single segment contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Quota was zero, so the store was not queried.
    Skipped,
    /// Topics returned by the store, at most `quota` of them.
    Fetched(Vec<FeedTopic>),
    /// The store failed or timed out; the segment contributes nothing.
    Failed(String),
}

impl SegmentOutcome {
    #[must_use]
    pub fn topics(&self) -> &[FeedTopic] {
        match self {
            Self::Fetched(topics) => topics,
            Self::Skipped | Self::Failed(_) => &[],
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A segment plan paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentResult {
    pub plan: SegmentPlan,
    pub outcome: SegmentOutcome,
}

/// Fetch one segment, never failing the caller.
///
/// Store errors and timeouts are logged and reported as
/// [`SegmentOutcome::Failed`].
pub async fn fetch_segment(
    store: &dyn TopicStore,
    plan: &SegmentPlan,
    bounds: &DayBoundaries,
    exclude_ids: &[i64],
    timeout: Duration,
) -> SegmentOutcome {
    if plan.quota == 0 {
        debug!(segment = %plan.kind, "Skipping segment with zero quota");
        return SegmentOutcome::Skipped;
    }

    let query = TopicQuery {
        range: bounds.range(plan.window),
        order: plan.order,
        limit: plan.quota,
        exclude_ids: exclude_ids.to_vec(),
    };

    match tokio::time::timeout(timeout, store.query_topics(&query)).await {
        Ok(Ok(mut topics)) => {
            topics.truncate(plan.quota as usize);
            debug!(
                segment = %plan.kind,
                quota = plan.quota,
                fetched = topics.len(),
                "Fetched feed segment"
            );
            SegmentOutcome::Fetched(topics)
        }
        Ok(Err(e)) => {
            warn!(segment = %plan.kind, "Feed segment query failed: {e:#}");
            SegmentOutcome::Failed(format!("{e:#}"))
        }
        Err(_) => {
            warn!(
                segment = %plan.kind,
                timeout_ms = timeout.as_millis() as u64,
                "Feed segment query timed out"
            );
            SegmentOutcome::Failed(format!("timed out after {}ms", timeout.as_millis()))
        }
    }
}

/// Fetch segments one after another. Each query excludes every topic chosen
/// by the segments before it.
pub async fn fetch_sequential(
    store: &dyn TopicStore,
    plans: &[SegmentPlan],
    bounds: &DayBoundaries,
    timeout: Duration,
) -> Vec<SegmentResult> {
    let mut chosen: Vec<i64> = Vec::new();
    let mut results = Vec::with_capacity(plans.len());

    for plan in plans {
        let outcome = fetch_segment(store, plan, bounds, &chosen, timeout).await;
        chosen.extend(outcome.topics().iter().map(|t| t.id));
        results.push(SegmentResult {
            plan: *plan,
            outcome,
        });
    }

    results
}

/// Fetch all segments at once without exclusions. Overlaps are resolved by
/// the assembler in priority order.
pub async fn fetch_concurrent(
    store: &dyn TopicStore,
    plans: &[SegmentPlan],
    bounds: &DayBoundaries,
    timeout: Duration,
) -> Vec<SegmentResult> {
    join_all(plans.iter().map(|plan| async move {
        SegmentResult {
            plan: *plan,
            outcome: fetch_segment(store, plan, bounds, &[], timeout).await,
        }
    }))
    .await
}
