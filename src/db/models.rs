use serde::{Deserialize, Serialize};

/// A topic joined with its author, category and engagement counts.
///
/// `like_count`, `comment_count` and `popularity_score` are computed by the
/// query that produced the row; they are never stored on `topics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedTopic {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub text_content: String,
    pub image_url: Option<String>,
    pub is_pinned: bool,
    pub is_highlighted: bool,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
    pub author_username: Option<String>,
    pub author_avatar: Option<String>,
    pub category_name: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub popularity_score: i64,
}

/// Data for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// Data for inserting a new category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Data for inserting a new topic.
#[derive(Debug, Clone, Default)]
pub struct NewTopic {
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub text_content: String,
    pub image_url: Option<String>,
    /// SQLite timestamp (`YYYY-MM-DD HH:MM:SS`, UTC). `None` means now.
    pub created_at: Option<String>,
}

/// Data for inserting a new comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub topic_id: i64,
    pub user_id: i64,
    pub body: String,
}

/// Ordering applied to a topic query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicOrder {
    /// Most liked/commented first, newest first among ties.
    PopularityDesc,
    /// Least liked/commented first, newest first among ties.
    PopularityAsc,
    /// Newest first.
    Recency,
}

impl TopicOrder {
    /// SQL `ORDER BY` clause for this ordering. Topic id is the last tie-break
    /// so results are deterministic.
    #[must_use]
    pub fn order_by_sql(self) -> &'static str {
        match self {
            Self::PopularityDesc => "popularity_score DESC, t.created_at DESC, t.id DESC",
            Self::PopularityAsc => "popularity_score ASC, t.created_at DESC, t.id DESC",
            Self::Recency => "t.created_at DESC, t.id DESC",
        }
    }
}

/// Half-open creation-time range `[from, until)`; either bound may be open.
///
/// Bounds use the same text format as `topics.created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedRange {
    pub from: Option<String>,
    pub until: Option<String>,
}

/// A bounded, ordered read of topics with engagement metrics attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQuery {
    pub range: CreatedRange,
    pub order: TopicOrder,
    pub limit: u32,
    pub exclude_ids: Vec<i64>,
}
