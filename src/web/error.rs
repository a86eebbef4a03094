use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::feed::FeedError;

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        match &self {
            Self::StoreUnavailable { failed } => {
                tracing::error!(failed = ?failed, "Feed unavailable: {self}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "error": "Feed is temporarily unavailable",
                        "failed_segments": failed,
                    })),
                )
                    .into_response()
            }
            Self::InvalidPage | Self::InvalidPageSize | Self::PageSizeTooLarge { .. } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
        }
    }
}
