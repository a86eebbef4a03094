use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{FeedTopic, NewCategory, NewComment, NewTopic, NewUser, TopicQuery};

/// Columns shared by every feed read. Counts come from correlated subqueries
/// so they always reflect the current likes/comments rows.
const FEED_TOPIC_COLUMNS: &str = r"
    t.id, t.user_id, t.category_id, t.title, t.text_content, t.image_url,
    t.is_pinned, t.is_highlighted, t.is_verified, t.created_at, t.updated_at,
    u.username AS author_username,
    u.avatar_url AS author_avatar,
    c.name AS category_name,
    (SELECT COUNT(*) FROM likes lk WHERE lk.topic_id = t.id) AS like_count,
    (SELECT COUNT(*) FROM comments cm WHERE cm.topic_id = t.id) AS comment_count,
    (SELECT COUNT(*) FROM likes lk WHERE lk.topic_id = t.id)
        + (SELECT COUNT(*) FROM comments cm WHERE cm.topic_id = t.id) AS popularity_score
";

// ========== Users ==========

/// Insert a new user, returning its ID.
pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<i64> {
    let result = sqlx::query("INSERT INTO users (username, email, avatar_url) VALUES (?, ?, ?)")
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .execute(pool)
        .await
        .context("Failed to insert user")?;

    Ok(result.last_insert_rowid())
}

// ========== Categories ==========

/// Insert a new category, returning its ID.
pub async fn insert_category(pool: &SqlitePool, category: &NewCategory) -> Result<i64> {
    let result = sqlx::query("INSERT INTO categories (name, description) VALUES (?, ?)")
        .bind(&category.name)
        .bind(&category.description)
        .execute(pool)
        .await
        .context("Failed to insert category")?;

    Ok(result.last_insert_rowid())
}

/// Delete a category. Topics in it keep existing with no category.
pub async fn delete_category(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

// ========== Topics ==========

/// Insert a new topic, returning its ID.
pub async fn insert_topic(pool: &SqlitePool, topic: &NewTopic) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO topics (user_id, category_id, title, text_content, image_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, COALESCE(?, datetime('now')), COALESCE(?, datetime('now')))
        ",
    )
    .bind(topic.user_id)
    .bind(topic.category_id)
    .bind(&topic.title)
    .bind(&topic.text_content)
    .bind(&topic.image_url)
    .bind(&topic.created_at)
    .bind(&topic.created_at)
    .execute(pool)
    .await
    .context("Failed to insert topic")?;

    Ok(result.last_insert_rowid())
}

/// Delete a topic together with its likes and comments.
pub async fn delete_topic(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete topic")?;

    Ok(())
}

/// Get a single topic with its engagement metrics.
pub async fn get_feed_topic(pool: &SqlitePool, id: i64) -> Result<Option<FeedTopic>> {
    let query = format!(
        r"
        SELECT {FEED_TOPIC_COLUMNS}
        FROM topics t
        LEFT JOIN users u ON t.user_id = u.id
        LEFT JOIN categories c ON t.category_id = c.id
        WHERE t.id = ?
        "
    );

    sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch topic")
}

/// Count all topics in storage.
pub async fn count_topics(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics")
        .fetch_one(pool)
        .await
        .context("Failed to count topics")?;
    Ok(row.0)
}

/// Run a bounded, ordered topic read with like/comment counts joined in.
///
/// Topics listed in `exclude_ids` are filtered out before the limit applies.
pub async fn query_topics(pool: &SqlitePool, query: &TopicQuery) -> Result<Vec<FeedTopic>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut conditions: Vec<String> = Vec::new();
    if query.range.from.is_some() {
        conditions.push("t.created_at >= ?".to_string());
    }
    if query.range.until.is_some() {
        conditions.push("t.created_at < ?".to_string());
    }
    if !query.exclude_ids.is_empty() {
        let placeholders = std::iter::repeat_n("?", query.exclude_ids.len())
            .collect::<Vec<_>>()
            .join(",");
        conditions.push(format!("t.id NOT IN ({placeholders})"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        r"
        SELECT {FEED_TOPIC_COLUMNS}
        FROM topics t
        LEFT JOIN users u ON t.user_id = u.id
        LEFT JOIN categories c ON t.category_id = c.id
        {where_clause}
        ORDER BY {order_by}
        LIMIT ?
        ",
        order_by = query.order.order_by_sql(),
    );

    // Bind in order of ? placeholders
    let mut q = sqlx::query_as::<_, FeedTopic>(&sql);
    if let Some(from) = &query.range.from {
        q = q.bind(from);
    }
    if let Some(until) = &query.range.until {
        q = q.bind(until);
    }
    for id in &query.exclude_ids {
        q = q.bind(id);
    }
    q = q.bind(i64::from(query.limit));

    q.fetch_all(pool).await.context("Failed to query topics")
}

// ========== Engagement ==========

/// Insert a comment on a topic, returning its ID.
pub async fn insert_comment(pool: &SqlitePool, comment: &NewComment) -> Result<i64> {
    let result = sqlx::query("INSERT INTO comments (topic_id, user_id, body) VALUES (?, ?, ?)")
        .bind(comment.topic_id)
        .bind(comment.user_id)
        .bind(&comment.body)
        .execute(pool)
        .await
        .context("Failed to insert comment")?;

    Ok(result.last_insert_rowid())
}

/// Record that a user liked a topic. Liking twice is a no-op.
///
/// Returns `true` if a new like was recorded.
pub async fn like_topic(pool: &SqlitePool, user_id: i64, topic_id: i64) -> Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO likes (user_id, topic_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(topic_id)
        .execute(pool)
        .await
        .context("Failed to like topic")?;

    Ok(result.rows_affected() > 0)
}

/// Remove a user's like from a topic.
///
/// Returns `true` if a like was removed.
pub async fn unlike_topic(pool: &SqlitePool, user_id: i64, topic_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND topic_id = ?")
        .bind(user_id)
        .bind(topic_id)
        .execute(pool)
        .await
        .context("Failed to unlike topic")?;

    Ok(result.rows_affected() > 0)
}
