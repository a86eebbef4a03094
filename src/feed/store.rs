use anyhow::Result;
use async_trait::async_trait;

use crate::db::{self, Database, FeedTopic, TopicQuery};

/// Read access to topics for feed construction.
///
/// The feed engine only talks to storage through this trait, so tests can
/// substitute an in-memory or failing store.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Return up to `query.limit` topics in `query.range`, ordered by
    /// `query.order`, skipping `query.exclude_ids`, with engagement counts.
    async fn query_topics(&self, query: &TopicQuery) -> Result<Vec<FeedTopic>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TopicStore for Database {
    async fn query_topics(&self, query: &TopicQuery) -> Result<Vec<FeedTopic>> {
        db::query_topics(self.pool(), query).await
    }

    async fn ping(&self) -> Result<()> {
        Database::ping(self).await
    }
}
