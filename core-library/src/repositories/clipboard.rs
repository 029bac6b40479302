//! Clipboard item repository trait and implementation
//!
//! Every item-level query carries the owner's [`UserId`] as a predicate, so an
//! item that exists but belongs to someone else looks exactly like a missing
//! one.
//!
//! The client-id keyed upsert is a single `INSERT ... ON CONFLICT DO UPDATE`
//! against the partial unique index on `(user_id, client_id)`, so two devices
//! racing on the same key can neither double-insert nor lose the row.

use crate::error::{LibraryError, Result};
use crate::models::{
    now_micros, to_micros, ClipboardItem, ClipboardItemRow, ClipboardType, DailyCount, ItemChanges,
    ItemId, NewClipboardItem, TypeCount, UpsertOutcome,
};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_auth::UserId;
use sqlx::{query_as, QueryBuilder, Sqlite, SqlitePool};

const ITEM_COLUMNS: &str =
    "id, user_id, client_id, content, item_type, timestamp, created_at, updated_at";

/// Optional predicates for listing a user's items, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Only items whose logical timestamp is at or after this instant
    pub since: Option<DateTime<Utc>>,
    pub item_type: Option<ClipboardType>,
    /// Literal substring of the content
    pub search: Option<String>,
}

/// Clipboard repository interface for data access operations
#[async_trait]
pub trait ClipboardRepository: Send + Sync {
    /// Insert a new item under a fresh id.
    async fn insert(&self, item: NewClipboardItem) -> Result<ClipboardItem>;

    /// Insert, or overwrite the row already holding `(user_id, client_id)`.
    ///
    /// On overwrite the row keeps its id and `created_at`; content, type,
    /// timestamp and `updated_at` are replaced.
    ///
    /// # Errors
    /// [`LibraryError::InvalidInput`] when `client_id` is missing or blank.
    async fn upsert_by_client(&self, item: NewClipboardItem) -> Result<UpsertOutcome>;

    async fn find(&self, user_id: &UserId, id: &ItemId) -> Result<Option<ClipboardItem>>;

    /// Apply `changes` to an owned item and bump `updated_at`.
    ///
    /// Returns `None` when the item does not exist for this user.
    async fn update(
        &self,
        user_id: &UserId,
        id: &ItemId,
        changes: ItemChanges,
    ) -> Result<Option<ClipboardItem>>;

    /// Returns `false` when the item does not exist for this user.
    async fn delete(&self, user_id: &UserId, id: &ItemId) -> Result<bool>;

    /// Page through a user's items, newest logical timestamp first.
    async fn query(
        &self,
        user_id: &UserId,
        filter: &ItemFilter,
        page_request: PageRequest,
    ) -> Result<Page<ClipboardItem>>;

    /// The item with the greatest `updated_at`.
    async fn latest_updated(&self, user_id: &UserId) -> Result<Option<ClipboardItem>>;

    /// Up to `limit` items, newest `created_at` first.
    async fn recent_created(&self, user_id: &UserId, limit: u32) -> Result<Vec<ClipboardItem>>;

    async fn count_for_user(&self, user_id: &UserId) -> Result<i64>;

    /// Sum of content byte lengths, computed by the store.
    async fn total_content_bytes(&self, user_id: &UserId) -> Result<i64>;

    async fn count_by_type(&self, user_id: &UserId) -> Result<Vec<TypeCount>>;

    /// Items per UTC calendar day of the logical timestamp, from `since`
    /// onwards, most recent day first.
    async fn daily_counts_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>>;

    /// Remove every item (any owner) created before `cutoff`.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn count_all(&self) -> Result<i64>;
}

/// SQLite implementation of ClipboardRepository
pub struct SqliteClipboardRepository {
    pool: SqlitePool,
}

impl SqliteClipboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so `search` matches literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, user_id: &UserId, filter: &ItemFilter) {
    builder.push(" WHERE user_id = ").push_bind(user_id.to_string());

    if let Some(since) = filter.since {
        builder.push(" AND timestamp >= ").push_bind(to_micros(since));
    }
    if let Some(item_type) = filter.item_type {
        builder.push(" AND item_type = ").push_bind(item_type.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND content LIKE ")
            .push_bind(like_pattern(search))
            .push(" ESCAPE '\\'");
    }
}

fn into_items(rows: Vec<ClipboardItemRow>) -> Result<Vec<ClipboardItem>> {
    rows.into_iter().map(ClipboardItem::try_from).collect()
}

#[async_trait]
impl ClipboardRepository for SqliteClipboardRepository {
    async fn insert(&self, item: NewClipboardItem) -> Result<ClipboardItem> {
        let id = ItemId::new();
        let now = to_micros(now_micros());

        let sql = format!(
            "INSERT INTO clipboard_items ({cols}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {cols}",
            cols = ITEM_COLUMNS
        );
        let row = query_as::<_, ClipboardItemRow>(&sql)
            .bind(id.to_string())
            .bind(item.user_id.to_string())
            .bind(item.client_id.as_deref().filter(|c| !c.is_empty()))
            .bind(&item.content)
            .bind(item.item_type.as_str())
            .bind(to_micros(item.timestamp))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        ClipboardItem::try_from(row)
    }

    async fn upsert_by_client(&self, item: NewClipboardItem) -> Result<UpsertOutcome> {
        let client_id = item
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LibraryError::InvalidInput {
                field: "client_id".to_string(),
                message: "client_id is required for upsert".to_string(),
            })?;

        let candidate = ItemId::new();
        let now = to_micros(now_micros());

        let sql = format!(
            r#"
            INSERT INTO clipboard_items ({cols})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, client_id) WHERE client_id IS NOT NULL AND client_id <> ''
            DO UPDATE SET
                content = excluded.content,
                item_type = excluded.item_type,
                timestamp = excluded.timestamp,
                updated_at = excluded.updated_at
            RETURNING {cols}
            "#,
            cols = ITEM_COLUMNS
        );
        let row = query_as::<_, ClipboardItemRow>(&sql)
            .bind(candidate.to_string())
            .bind(item.user_id.to_string())
            .bind(client_id)
            .bind(&item.content)
            .bind(item.item_type.as_str())
            .bind(to_micros(item.timestamp))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        let item = ClipboardItem::try_from(row)?;
        let created = item.id == candidate;
        Ok(UpsertOutcome { item, created })
    }

    async fn find(&self, user_id: &UserId, id: &ItemId) -> Result<Option<ClipboardItem>> {
        let sql = format!(
            "SELECT {} FROM clipboard_items WHERE id = ? AND user_id = ?",
            ITEM_COLUMNS
        );
        let row = query_as::<_, ClipboardItemRow>(&sql)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ClipboardItem::try_from).transpose()
    }

    async fn update(
        &self,
        user_id: &UserId,
        id: &ItemId,
        changes: ItemChanges,
    ) -> Result<Option<ClipboardItem>> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("UPDATE clipboard_items SET updated_at = ");
        builder.push_bind(to_micros(now_micros()));

        if let Some(content) = changes.content {
            builder.push(", content = ").push_bind(content);
        }
        if let Some(item_type) = changes.item_type {
            builder.push(", item_type = ").push_bind(item_type.as_str());
        }
        if let Some(timestamp) = changes.timestamp {
            builder.push(", timestamp = ").push_bind(to_micros(timestamp));
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id.to_string())
            .push(" AND user_id = ")
            .push_bind(user_id.to_string())
            .push(" RETURNING ")
            .push(ITEM_COLUMNS);

        let row = builder
            .build_query_as::<ClipboardItemRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(ClipboardItem::try_from).transpose()
    }

    async fn delete(&self, user_id: &UserId, id: &ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clipboard_items WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        user_id: &UserId,
        filter: &ItemFilter,
        page_request: PageRequest,
    ) -> Result<Page<ClipboardItem>> {
        let mut count_builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM clipboard_items");
        push_filter(&mut count_builder, user_id, filter);
        let total: (i64,) = count_builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT ");
        builder.push(ITEM_COLUMNS).push(" FROM clipboard_items");
        push_filter(&mut builder, user_id, filter);
        builder
            .push(" ORDER BY timestamp DESC, created_at DESC, id ASC LIMIT ")
            .push_bind(page_request.limit())
            .push(" OFFSET ")
            .push_bind(page_request.offset());

        let rows = builder
            .build_query_as::<ClipboardItemRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            into_items(rows)?,
            total.0.max(0) as u64,
            page_request,
        ))
    }

    async fn latest_updated(&self, user_id: &UserId) -> Result<Option<ClipboardItem>> {
        let sql = format!(
            "SELECT {} FROM clipboard_items WHERE user_id = ? \
             ORDER BY updated_at DESC, id ASC LIMIT 1",
            ITEM_COLUMNS
        );
        let row = query_as::<_, ClipboardItemRow>(&sql)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ClipboardItem::try_from).transpose()
    }

    async fn recent_created(&self, user_id: &UserId, limit: u32) -> Result<Vec<ClipboardItem>> {
        let sql = format!(
            "SELECT {} FROM clipboard_items WHERE user_id = ? \
             ORDER BY created_at DESC, id ASC LIMIT ?",
            ITEM_COLUMNS
        );
        let rows = query_as::<_, ClipboardItemRow>(&sql)
            .bind(user_id.to_string())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        into_items(rows)
    }

    async fn count_for_user(&self, user_id: &UserId) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clipboard_items WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }

    async fn total_content_bytes(&self, user_id: &UserId) -> Result<i64> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(LENGTH(CAST(content AS BLOB))), 0) FROM clipboard_items WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(total.0)
    }

    async fn count_by_type(&self, user_id: &UserId) -> Result<Vec<TypeCount>> {
        let rows = query_as::<_, TypeCount>(
            r#"
            SELECT item_type, COUNT(*) AS count
            FROM clipboard_items
            WHERE user_id = ?
            GROUP BY item_type
            ORDER BY item_type
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn daily_counts_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>> {
        let rows = query_as::<_, DailyCount>(
            r#"
            SELECT DATE(timestamp / 1000000, 'unixepoch') AS date, COUNT(*) AS count
            FROM clipboard_items
            WHERE user_id = ? AND timestamp >= ?
            GROUP BY date
            ORDER BY date DESC
            "#,
        )
        .bind(user_id.to_string())
        .bind(to_micros(since))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM clipboard_items WHERE created_at < ?")
            .bind(to_micros(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_all(&self) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clipboard_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, insert_test_user};
    use chrono::{Duration, TimeZone};

    fn new_item(user_id: UserId, content: &str) -> NewClipboardItem {
        NewClipboardItem {
            user_id,
            client_id: None,
            content: content.to_string(),
            item_type: ClipboardType::Text,
            timestamp: Utc::now(),
        }
    }

    fn synced(user_id: UserId, client_id: &str, content: &str) -> NewClipboardItem {
        NewClipboardItem {
            client_id: Some(client_id.to_string()),
            ..new_item(user_id, content)
        }
    }

    async fn setup() -> (SqliteClipboardRepository, UserId, SqlitePool) {
        let pool = create_test_pool().await.unwrap();
        let user = insert_test_user(&pool, "alice").await.unwrap();
        (SqliteClipboardRepository::new(pool.clone()), user, pool)
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (repo, user, _) = setup().await;

        let item = repo.insert(new_item(user, "hello")).await.unwrap();
        assert_eq!(item.content, "hello");
        assert_eq!(item.user_id, user);
        assert_eq!(item.created_at, item.updated_at);

        let found = repo.find(&user, &item.id).await.unwrap().unwrap();
        assert_eq!(found, item);
    }

    #[tokio::test]
    async fn test_insert_always_creates_new_rows() {
        let (repo, user, _) = setup().await;

        let a = repo.insert(new_item(user, "same")).await.unwrap();
        let b = repo.insert(new_item(user, "same")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(repo.count_for_user(&user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (repo, user, _) = setup().await;

        let first = repo.upsert_by_client(synced(user, "laptop", "one")).await.unwrap();
        assert!(first.created);

        let second = repo.upsert_by_client(synced(user, "laptop", "one")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.item.id, first.item.id);

        let mut changed = synced(user, "laptop", "two");
        changed.item_type = ClipboardType::File;
        let third = repo.upsert_by_client(changed).await.unwrap();
        assert!(!third.created);
        assert_eq!(third.item.id, first.item.id);
        assert_eq!(third.item.content, "two");
        assert_eq!(third.item.item_type, ClipboardType::File);
        assert_eq!(third.item.created_at, first.item.created_at);
        assert!(third.item.updated_at >= first.item.updated_at);

        assert_eq!(repo.count_for_user(&user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_is_scoped_per_user() {
        let (repo, alice, pool) = setup().await;
        let bob = insert_test_user(&pool, "bob").await.unwrap();

        let a = repo.upsert_by_client(synced(alice, "phone", "a")).await.unwrap();
        let b = repo.upsert_by_client(synced(bob, "phone", "b")).await.unwrap();

        assert!(a.created);
        assert!(b.created);
        assert_ne!(a.item.id, b.item.id);
    }

    #[tokio::test]
    async fn test_upsert_requires_client_id() {
        let (repo, user, _) = setup().await;

        assert!(matches!(
            repo.upsert_by_client(new_item(user, "x")).await,
            Err(LibraryError::InvalidInput { .. })
        ));
        assert!(matches!(
            repo.upsert_by_client(synced(user, "   ", "x")).await,
            Err(LibraryError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_converge_to_one_row() {
        let (repo, user, _) = setup().await;
        let repo = std::sync::Arc::new(repo);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.upsert_by_client(synced(user, "desktop", &format!("v{}", i)))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.count_for_user(&user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ownership_scoping() {
        let (repo, alice, pool) = setup().await;
        let bob = insert_test_user(&pool, "bob").await.unwrap();
        let item = repo.insert(new_item(alice, "private")).await.unwrap();

        assert!(repo.find(&bob, &item.id).await.unwrap().is_none());
        assert!(repo
            .update(
                &bob,
                &item.id,
                ItemChanges {
                    content: Some("pwned".to_string()),
                    ..Default::default()
                }
            )
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete(&bob, &item.id).await.unwrap());

        let still = repo.find(&alice, &item.id).await.unwrap().unwrap();
        assert_eq!(still.content, "private");
    }

    #[tokio::test]
    async fn test_update_applies_changes() {
        let (repo, user, _) = setup().await;
        let item = repo.insert(new_item(user, "before")).await.unwrap();
        let when = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        let updated = repo
            .update(
                &user,
                &item.id,
                ItemChanges {
                    content: Some("after".to_string()),
                    item_type: Some(ClipboardType::Image),
                    timestamp: Some(when),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, item.id);
        assert_eq!(updated.content, "after");
        assert_eq!(updated.item_type, ClipboardType::Image);
        assert_eq!(updated.timestamp, when);
        assert!(updated.updated_at >= item.updated_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, user, _) = setup().await;
        let item = repo.insert(new_item(user, "bye")).await.unwrap();

        assert!(repo.delete(&user, &item.id).await.unwrap());
        assert!(!repo.delete(&user, &item.id).await.unwrap());
        assert!(repo.find(&user, &item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_pagination_and_order() {
        let (repo, user, _) = setup().await;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for i in 0..25 {
            let mut item = new_item(user, &format!("item {}", i));
            item.timestamp = base + Duration::minutes(i);
            repo.insert(item).await.unwrap();
        }

        let first = repo
            .query(&user, &ItemFilter::default(), PageRequest::new(1, 20))
            .await
            .unwrap();
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.items[0].content, "item 24");
        assert!(first.has_next);

        let second = repo
            .query(&user, &ItemFilter::default(), PageRequest::new(2, 20))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 5);
        assert_eq!(second.total, 25);
        assert_eq!(second.total_pages, 2);
        assert!(!second.has_next);
        assert!(second.has_prev);
        assert_eq!(second.items[4].content, "item 0");
    }

    #[tokio::test]
    async fn test_query_filters_combine() {
        let (repo, user, _) = setup().await;
        let old = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut a = new_item(user, "apple pie");
        a.timestamp = new;
        repo.insert(a).await.unwrap();

        let mut b = new_item(user, "apple tart");
        b.timestamp = old;
        repo.insert(b).await.unwrap();

        let mut c = new_item(user, "apple.png");
        c.timestamp = new;
        c.item_type = ClipboardType::Image;
        repo.insert(c).await.unwrap();

        let filter = ItemFilter {
            since: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            item_type: Some(ClipboardType::Text),
            search: Some("apple".to_string()),
        };
        let page = repo.query(&user, &filter, PageRequest::default()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].content, "apple pie");
    }

    #[tokio::test]
    async fn test_search_is_literal() {
        let (repo, user, _) = setup().await;
        repo.insert(new_item(user, "100% sure")).await.unwrap();
        repo.insert(new_item(user, "1000 sure")).await.unwrap();

        let filter = ItemFilter {
            search: Some("0%".to_string()),
            ..Default::default()
        };
        let page = repo.query(&user, &filter, PageRequest::default()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].content, "100% sure");
    }

    #[tokio::test]
    async fn test_latest_uses_updated_at_and_recent_uses_created_at() {
        let (repo, user, _) = setup().await;

        let first = repo.insert(new_item(user, "first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.insert(new_item(user, "second")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        repo.update(
            &user,
            &first.id,
            ItemChanges {
                content: Some("first, edited".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let latest = repo.latest_updated(&user).await.unwrap().unwrap();
        assert_eq!(latest.id, first.id);

        let recent = repo.recent_created(&user, 10).await.unwrap();
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);

        assert_eq!(repo.recent_created(&user, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_aggregates() {
        let (repo, user, _) = setup().await;
        let day1 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 2, 23, 59, 59).unwrap();

        let mut a = new_item(user, "héllo");
        a.timestamp = day1;
        repo.insert(a).await.unwrap();

        let mut b = new_item(user, "abc");
        b.timestamp = day2;
        b.item_type = ClipboardType::File;
        repo.insert(b).await.unwrap();

        let mut c = new_item(user, "");
        c.timestamp = day2;
        repo.insert(c).await.unwrap();

        // "héllo" is 6 bytes
        assert_eq!(repo.total_content_bytes(&user).await.unwrap(), 9);

        let by_type = repo.count_by_type(&user).await.unwrap();
        assert_eq!(
            by_type,
            vec![
                TypeCount { item_type: "file".to_string(), count: 1 },
                TypeCount { item_type: "text".to_string(), count: 2 },
            ]
        );

        let daily = repo.daily_counts_since(&user, day1).await.unwrap();
        assert_eq!(
            daily,
            vec![
                DailyCount { date: "2024-03-02".to_string(), count: 2 },
                DailyCount { date: "2024-03-01".to_string(), count: 1 },
            ]
        );

        let later = repo
            .daily_counts_since(&user, day1 + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(later.len(), 1);
    }

    #[tokio::test]
    async fn test_aggregates_on_empty_user() {
        let (repo, user, _) = setup().await;

        assert_eq!(repo.count_for_user(&user).await.unwrap(), 0);
        assert_eq!(repo.total_content_bytes(&user).await.unwrap(), 0);
        assert!(repo.count_by_type(&user).await.unwrap().is_empty());
        assert!(repo.latest_updated(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_created_before() {
        let (repo, user, pool) = setup().await;
        let old = repo.insert(new_item(user, "old")).await.unwrap();
        let fresh = repo.insert(new_item(user, "fresh")).await.unwrap();

        let long_ago = to_micros(Utc::now() - Duration::days(40));
        sqlx::query("UPDATE clipboard_items SET created_at = ? WHERE id = ?")
            .bind(long_ago)
            .bind(old.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let removed = repo
            .delete_created_before(Utc::now() - Duration::days(30))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(repo.find(&user, &old.id).await.unwrap().is_none());
        assert!(repo.find(&user, &fresh.id).await.unwrap().is_some());
        assert_eq!(repo.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_items_require_existing_owner() {
        let (repo, _, _) = setup().await;
        let stranger = UserId::new();

        assert!(matches!(
            repo.insert(new_item(stranger, "x")).await,
            Err(LibraryError::Database(_))
        ));
    }
}
