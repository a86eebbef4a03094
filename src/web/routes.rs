use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::AppState;
use crate::feed::{FeedError, FeedPage};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(feed))
        .route("/api/feed", get(feed))
        .route("/healthz", get(health))
}

/// Raw query parameters. Kept as strings so junk values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    page: Option<String>,
    limit: Option<String>,
}

async fn feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedPage>, FeedError> {
    let page = coerce_int(params.page.as_deref()).unwrap_or(1);
    let limit = coerce_int(params.limit.as_deref())
        .unwrap_or_else(|| i64::from(state.config.feed_default_limit));

    if page <= 0 {
        return Err(FeedError::InvalidPage);
    }
    if limit <= 0 {
        return Err(FeedError::InvalidPageSize);
    }
    // Pages beyond u32 are past the end of any pool anyway.
    let page = u32::try_from(page).unwrap_or(u32::MAX);
    let limit = u32::try_from(limit).map_err(|_| FeedError::PageSizeTooLarge {
        max: state.feed.settings().max_limit,
    })?;

    state.feed.build_feed(page, limit).await.map(Json)
}

async fn health(State(state): State<AppState>) -> Response {
    match state.feed.ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {e:#}");
            (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable").into_response()
        }
    }
}

/// Lenient integer parse: optional leading whitespace and sign, then the
/// longest run of digits. Trailing junk is ignored (`"12abc"` is 12).
/// Returns `None` when no digits are present. Values too large for `i64`
/// saturate.
#[must_use]
pub fn coerce_int(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}
