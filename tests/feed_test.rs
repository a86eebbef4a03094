//! Integration tests for feed construction against SQLite.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use forum_feed::config::FetchStrategy;
use forum_feed::db::{
    insert_comment, insert_topic, insert_user, Database, FeedTopic, NewComment, NewTopic, NewUser,
    TopicQuery,
};
use forum_feed::feed::{FeedError, FeedPage, FeedService, FeedSettings, SegmentKind, TopicStore};
use tempfile::TempDir;

const NOW: &str = "2026-03-10 12:00:00";

fn now() -> DateTime<Utc> {
    Utc.from_utc_datetime(&NaiveDateTime::parse_from_str(NOW, "%Y-%m-%d %H:%M:%S").unwrap())
}

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

async fn create_author(db: &Database) -> i64 {
    insert_user(
        db.pool(),
        &NewUser {
            username: "author".to_string(),
            email: "author@example.com".to_string(),
            avatar_url: None,
        },
    )
    .await
    .expect("Failed to insert user")
}

/// Insert a topic with `score` comments, so its popularity score is `score`.
async fn seed_topic(db: &Database, author: i64, created_at: &str, score: usize) -> i64 {
    let topic_id = insert_topic(
        db.pool(),
        &NewTopic {
            user_id: author,
            title: format!("Topic from {created_at}"),
            text_content: "Body".to_string(),
            created_at: Some(created_at.to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to insert topic");

    for i in 0..score {
        insert_comment(
            db.pool(),
            &NewComment {
                topic_id,
                user_id: author,
                body: format!("Comment {i}"),
            },
        )
        .await
        .expect("Failed to insert comment");
    }
    topic_id
}

/// 15 topics today, 10 yesterday, 4 the day before yesterday, 6 older.
///
/// Day-before-yesterday topics are the most popular old ones, so
/// `past_super_popular` and `historical_other` never compete.
async fn seed_ample(db: &Database) {
    let author = create_author(db).await;
    for i in 0..15 {
        seed_topic(db, author, &format!("2026-03-10 {:02}:00:00", i % 12), i).await;
    }
    for i in 0..10 {
        seed_topic(db, author, &format!("2026-03-09 {:02}:00:00", i + 1), i).await;
    }
    for i in 0..4 {
        seed_topic(db, author, &format!("2026-03-08 {:02}:00:00", i + 1), 50 + i).await;
    }
    for i in 0..6 {
        seed_topic(db, author, &format!("2026-03-0{} 10:00:00", i + 1), i).await;
    }
}

fn service(store: Arc<dyn TopicStore>, strategy: FetchStrategy) -> FeedService {
    FeedService::new(
        store,
        FeedSettings {
            fetch_strategy: strategy,
            segment_timeout: Duration::from_secs(5),
            ..FeedSettings::default()
        },
    )
}

fn ids(page: &FeedPage) -> Vec<i64> {
    page.data.iter().map(|i| i.topic.id).collect()
}

fn count_segment(page: &FeedPage, kind: SegmentKind) -> usize {
    page.data.iter().filter(|i| i.segment == kind).count()
}

fn assert_priority_order(page: &FeedPage) {
    let kinds: Vec<SegmentKind> = page.data.iter().map(|i| i.segment).collect();
    let mut sorted = kinds.clone();
    sorted.sort();
    assert_eq!(kinds, sorted, "segments out of priority order");
}

fn assert_unique(page: &FeedPage) {
    let unique: HashSet<i64> = ids(page).into_iter().collect();
    assert_eq!(unique.len(), page.data.len(), "duplicate topic in feed");
}

/// Store wrapper that fails selected queries.
struct FlakyStore {
    inner: Database,
    fail_when: fn(&TopicQuery) -> bool,
}

#[async_trait]
impl TopicStore for FlakyStore {
    async fn query_topics(&self, query: &TopicQuery) -> Result<Vec<FeedTopic>> {
        if (self.fail_when)(query) {
            return Err(anyhow!("connection reset"));
        }
        self.inner.query_topics(query).await
    }
}

/// Store wrapper that records every query it receives.
struct RecordingStore {
    inner: Database,
    queries: Mutex<Vec<TopicQuery>>,
}

#[async_trait]
impl TopicStore for RecordingStore {
    async fn query_topics(&self, query: &TopicQuery) -> Result<Vec<FeedTopic>> {
        self.queries.lock().unwrap().push(query.clone());
        self.inner.query_topics(query).await
    }
}

/// Store that never answers in time.
struct StalledStore;

#[async_trait]
impl TopicStore for StalledStore {
    async fn query_topics(&self, _query: &TopicQuery) -> Result<Vec<FeedTopic>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_limit_twenty_allocation() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert_eq!(feed.data.len(), 20);
    assert_eq!(count_segment(&feed, SegmentKind::TodayPopular), 1);
    assert_eq!(count_segment(&feed, SegmentKind::TodayOther), 9);
    assert_eq!(count_segment(&feed, SegmentKind::YesterdayPopular), 5);
    assert_eq!(count_segment(&feed, SegmentKind::YesterdayLessPopular), 1);
    assert_eq!(count_segment(&feed, SegmentKind::PastSuperPopular), 2);
    assert_eq!(count_segment(&feed, SegmentKind::HistoricalLessPopular), 0);
    assert_eq!(count_segment(&feed, SegmentKind::HistoricalOther), 2);

    assert_eq!(feed.pagination.page, 1);
    assert_eq!(feed.pagination.limit, 20);
    assert_eq!(feed.pagination.total_topics, 20);
    assert_eq!(feed.pagination.total_pages, 1);
    assert!(feed.degraded_segments.is_empty());
    assert_unique(&feed);
    assert_priority_order(&feed);
}

#[tokio::test]
async fn test_segments_pick_expected_topics() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    let today_popular: Vec<&FeedTopic> = feed
        .data
        .iter()
        .filter(|i| i.segment == SegmentKind::TodayPopular)
        .map(|i| &i.topic)
        .collect();
    assert_eq!(today_popular[0].popularity_score, 14);

    let yesterday_scores: Vec<i64> = feed
        .data
        .iter()
        .filter(|i| i.segment == SegmentKind::YesterdayPopular)
        .map(|i| i.topic.popularity_score)
        .collect();
    assert_eq!(yesterday_scores, vec![9, 8, 7, 6, 5]);

    let less_popular: Vec<i64> = feed
        .data
        .iter()
        .filter(|i| i.segment == SegmentKind::YesterdayLessPopular)
        .map(|i| i.topic.popularity_score)
        .collect();
    assert_eq!(less_popular, vec![0]);

    // Spill forward: the most popular old topics fill the yesterday share
    let spill: Vec<&FeedTopic> = feed
        .data
        .iter()
        .filter(|i| i.segment == SegmentKind::PastSuperPopular)
        .map(|i| &i.topic)
        .collect();
    assert_eq!(spill.len(), 2);
    assert_eq!(spill[0].popularity_score, 53);
    assert_eq!(spill[1].popularity_score, 52);
    assert!(spill.iter().all(|t| t.created_at.starts_with("2026-03-08")));

    let historical: Vec<&str> = feed
        .data
        .iter()
        .filter(|i| i.segment == SegmentKind::HistoricalOther)
        .map(|i| i.topic.created_at.as_str())
        .collect();
    assert_eq!(historical, vec!["2026-03-06 10:00:00", "2026-03-05 10:00:00"]);
}

#[tokio::test]
async fn test_popular_today_topic_not_repeated_in_today_other() {
    let (db, _temp_dir) = setup_db().await;
    let author = create_author(&db).await;

    let star = seed_topic(&db, author, "2026-03-10 08:00:00", 40).await;
    for hour in 1..4 {
        seed_topic(&db, author, &format!("2026-03-10 0{hour}:00:00"), 1).await;
    }

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    let star_items: Vec<_> = feed.data.iter().filter(|i| i.topic.id == star).collect();
    assert_eq!(star_items.len(), 1);
    assert_eq!(star_items[0].segment, SegmentKind::TodayPopular);
    assert_eq!(feed.data[0].topic.id, star);
    assert_eq!(count_segment(&feed, SegmentKind::TodayOther), 3);
    assert_unique(&feed);
}

#[tokio::test]
async fn test_no_topics_today_still_builds_feed() {
    let (db, _temp_dir) = setup_db().await;
    let author = create_author(&db).await;
    seed_topic(&db, author, "2026-03-09 10:00:00", 3).await;
    seed_topic(&db, author, "2026-03-09 11:00:00", 0).await;
    seed_topic(&db, author, "2026-02-01 11:00:00", 0).await;

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert_eq!(count_segment(&feed, SegmentKind::TodayPopular), 0);
    assert_eq!(count_segment(&feed, SegmentKind::TodayOther), 0);
    assert_eq!(count_segment(&feed, SegmentKind::YesterdayPopular), 2);
    assert_eq!(count_segment(&feed, SegmentKind::PastSuperPopular), 1);
    assert_eq!(feed.pagination.total_topics, 3);
    assert!(feed.degraded_segments.is_empty());
}

#[tokio::test]
async fn test_empty_store_gives_empty_page() {
    let (db, _temp_dir) = setup_db().await;

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert!(feed.data.is_empty());
    assert_eq!(feed.pagination.total_topics, 0);
    assert_eq!(feed.pagination.total_pages, 0);
}

#[tokio::test]
async fn test_high_score_history_never_precedes_today() {
    let (db, _temp_dir) = setup_db().await;
    let author = create_author(&db).await;
    let today = seed_topic(&db, author, "2026-03-10 01:00:00", 0).await;
    let ancient = seed_topic(&db, author, "2025-01-01 00:00:00", 99).await;

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert_eq!(ids(&feed), vec![today, ancient]);
    assert_priority_order(&feed);
}

#[tokio::test]
async fn test_quota_shortfall_is_not_backfilled() {
    let (db, _temp_dir) = setup_db().await;
    let author = create_author(&db).await;
    // Plenty of topics today, nothing anywhere else
    for i in 0..30 {
        seed_topic(&db, author, &format!("2026-03-10 {:02}:30:00", i % 12), i % 4).await;
    }

    let feed = service(Arc::new(db), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    // Only the today share (10) is filled even though 30 topics exist
    assert_eq!(feed.data.len(), 10);
    assert_eq!(feed.pagination.total_topics, 10);
}

#[tokio::test]
async fn test_pages_concatenate_to_pool() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;
    let feed = service(Arc::new(db), FetchStrategy::Sequential);

    let first = feed.build_feed_at(1, 10, now()).await.unwrap();
    let second = feed.build_feed_at(2, 10, now()).await.unwrap();

    // The pool never outgrows one page, so page 2 is empty
    assert_eq!(first.pagination.total_topics, first.data.len());
    assert_eq!(first.pagination.total_pages, 1);
    assert!(second.data.is_empty());
    assert_eq!(second.pagination.total_topics, first.pagination.total_topics);
}

#[tokio::test]
async fn test_sequential_queries_exclude_chosen_topics() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;
    let store = Arc::new(RecordingStore {
        inner: db,
        queries: Mutex::new(Vec::new()),
    });

    let feed = service(store.clone(), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    let queries = store.queries.lock().unwrap();
    // historical_less_popular has a zero quota at limit 20 and is skipped
    assert_eq!(queries.len(), 6);
    assert!(queries[0].exclude_ids.is_empty());
    assert_eq!(queries[0].limit, 1);
    assert_eq!(queries[1].exclude_ids, vec![feed.data[0].topic.id]);

    let last = queries.last().unwrap();
    let chosen_before_last: Vec<i64> = feed
        .data
        .iter()
        .filter(|i| i.segment != SegmentKind::HistoricalOther)
        .map(|i| i.topic.id)
        .collect();
    assert_eq!(last.exclude_ids, chosen_before_last);
}

#[tokio::test]
async fn test_concurrent_matches_sequential_without_overlap() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;
    let store: Arc<dyn TopicStore> = Arc::new(db);

    let sequential = service(store.clone(), FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();
    let concurrent = service(store, FetchStrategy::Concurrent)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert_eq!(ids(&concurrent), ids(&sequential));
}

#[tokio::test]
async fn test_concurrent_dedups_overlapping_segments() {
    let (db, _temp_dir) = setup_db().await;
    let author = create_author(&db).await;
    // Three topics today: both today segments see all of them
    let a = seed_topic(&db, author, "2026-03-10 01:00:00", 5).await;
    let b = seed_topic(&db, author, "2026-03-10 02:00:00", 1).await;
    let c = seed_topic(&db, author, "2026-03-10 03:00:00", 0).await;

    let feed = service(Arc::new(db), FetchStrategy::Concurrent)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert_unique(&feed);
    assert_eq!(ids(&feed), vec![a, c, b]);
    assert_eq!(feed.data[0].segment, SegmentKind::TodayPopular);
    assert!(feed.data[1..]
        .iter()
        .all(|i| i.segment == SegmentKind::TodayOther));
}

#[tokio::test]
async fn test_failed_segments_degrade_the_feed() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;
    let store = Arc::new(FlakyStore {
        inner: db,
        // Only the today window has no upper bound
        fail_when: |q| q.range.until.is_none(),
    });

    let feed = service(store, FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap();

    assert_eq!(
        feed.degraded_segments,
        vec![SegmentKind::TodayPopular, SegmentKind::TodayOther]
    );
    assert_eq!(feed.data.len(), 10);
    assert_eq!(count_segment(&feed, SegmentKind::YesterdayPopular), 5);
}

#[tokio::test]
async fn test_total_failure_is_an_error() {
    let (db, _temp_dir) = setup_db().await;
    seed_ample(&db).await;
    let store = Arc::new(FlakyStore {
        inner: db,
        fail_when: |_| true,
    });

    let err = service(store, FetchStrategy::Sequential)
        .build_feed_at(1, 20, now())
        .await
        .unwrap_err();

    match err {
        FeedError::StoreUnavailable { failed } => assert_eq!(failed.len(), 6),
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timed_out_segments_count_as_failed() {
    let feed = FeedService::new(
        Arc::new(StalledStore),
        FeedSettings {
            segment_timeout: Duration::from_millis(20),
            fetch_strategy: FetchStrategy::Concurrent,
            ..FeedSettings::default()
        },
    );

    let err = feed.build_feed_at(1, 20, now()).await.unwrap_err();
    assert!(matches!(err, FeedError::StoreUnavailable { .. }));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (db, _temp_dir) = setup_db().await;
    let feed = service(Arc::new(db), FetchStrategy::Sequential);

    assert!(matches!(
        feed.build_feed_at(0, 20, now()).await,
        Err(FeedError::InvalidPage)
    ));
    assert!(matches!(
        feed.build_feed_at(1, 0, now()).await,
        Err(FeedError::InvalidPageSize)
    ));
    assert!(matches!(
        feed.build_feed_at(1, 101, now()).await,
        Err(FeedError::PageSizeTooLarge { max: 100 })
    ));
}
