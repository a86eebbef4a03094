use thiserror::Error;

use super::plan::SegmentKind;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("limit must be a positive integer")]
    InvalidPageSize,
    #[error("page must be a positive integer")]
    InvalidPage,
    #[error("limit must not exceed {max}")]
    PageSizeTooLarge { max: u32 },
    #[error("topic store unavailable: all {count} attempted feed segments failed", count = .failed.len())]
    StoreUnavailable { failed: Vec<SegmentKind> },
}

impl FeedError {
    /// Whether the caller sent bad input, as opposed to a server-side failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StoreUnavailable { .. })
    }
}
