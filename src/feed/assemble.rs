//! Merging segment results into one deduplicated, paginated feed.

use std::collections::HashSet;

use serde::Serialize;

use super::fetch::{SegmentOutcome, SegmentResult};
use super::plan::SegmentKind;
use super::FeedError;
use crate::db::FeedTopic;

/// A topic in the feed, tagged with the segment that contributed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub topic: FeedTopic,
    pub segment: SegmentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    /// Size of the pool built for this request, not the number of topics in storage.
    pub total_topics: usize,
    pub total_pages: usize,
}

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
    pub data: Vec<FeedItem>,
    pub pagination: Pagination,
    /// Segments whose fetch failed while others succeeded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded_segments: Vec<SegmentKind>,
}

/// Concatenate segment outputs in priority order, keeping the first
/// occurrence of every topic ID.
#[must_use]
pub fn build_pool(results: &[SegmentResult]) -> Vec<FeedItem> {
    let mut ordered: Vec<&SegmentResult> = results.iter().collect();
    // Stable, so equal kinds keep their input order.
    ordered.sort_by_key(|r| r.plan.kind);

    let mut seen = HashSet::new();
    let mut pool = Vec::new();
    for result in ordered {
        for topic in result.outcome.topics() {
            if seen.insert(topic.id) {
                pool.push(FeedItem {
                    topic: topic.clone(),
                    segment: result.plan.kind,
                });
            }
        }
    }
    pool
}

/// Build the requested page from segment results.
///
/// # Errors
///
/// - [`FeedError::InvalidPage`] / [`FeedError::InvalidPageSize`] for zero inputs.
/// - [`FeedError::StoreUnavailable`] when at least one segment was queried
///   and every queried segment failed.
pub fn assemble(results: &[SegmentResult], page: u32, limit: u32) -> Result<FeedPage, FeedError> {
    if page == 0 {
        return Err(FeedError::InvalidPage);
    }
    if limit == 0 {
        return Err(FeedError::InvalidPageSize);
    }

    let failed: Vec<SegmentKind> = results
        .iter()
        .filter(|r| r.outcome.is_failed())
        .map(|r| r.plan.kind)
        .collect();
    let attempted = results
        .iter()
        .filter(|r| !matches!(r.outcome, SegmentOutcome::Skipped))
        .count();
    if attempted > 0 && failed.len() == attempted {
        return Err(FeedError::StoreUnavailable { failed });
    }

    let pool = build_pool(results);
    let total_topics = pool.len();
    let limit_len = limit as usize;
    let offset = (page as usize - 1).saturating_mul(limit_len);

    let data = pool.into_iter().skip(offset).take(limit_len).collect();

    Ok(FeedPage {
        data,
        pagination: Pagination {
            page,
            limit,
            total_topics,
            total_pages: total_topics.div_ceil(limit_len),
        },
        degraded_segments: failed,
    })
}
