//! # Sync Reconciler
//!
//! Applies client clipboard writes to the store and answers read queries,
//! always scoped to one authenticated user.
//!
//! ## Write paths
//!
//! - [`SyncReconciler::create`] always inserts under a fresh server id.
//! - [`SyncReconciler::sync_item`] is keyed by the client's `client_id`: the
//!   first sync inserts, later syncs with the same key overwrite content, type
//!   and timestamp in place. The store performs this as one atomic upsert, so
//!   devices retrying or racing on the same key converge on a single row.
//! - [`SyncReconciler::batch_sync`] processes items in order and never aborts;
//!   each item either lands in `synced` or is reported in `failed` with a
//!   short reason.
//!
//! Every write validates presence, byte size and type, sanitizes the content
//! and resolves the client timestamp (server time when absent).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let reconciler = SyncReconciler::new(repository, ReconcilerConfig::default());
//! let outcome = reconciler.sync_item(&user_id, input).await?;
//! if outcome.is_created() { /* 201 */ }
//! ```

use crate::content::{self, REPORT_PREVIEW_CHARS};
use crate::error::{Result, SyncError};
use crate::timestamp;
use chrono::{DateTime, Utc};
use core_auth::UserId;
use core_library::models::{now_micros, ItemChanges, ItemId, UpsertOutcome};
use core_library::repositories::{ClipboardRepository, ItemFilter, Page, PageRequest};
use core_library::{ClipboardItem, ClipboardType, NewClipboardItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_RECENT_LIMIT: u32 = 10;
pub const MAX_RECENT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound on content size, in UTF-8 bytes
    pub max_content_bytes: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A clipboard entry as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewItemInput {
    #[serde(default)]
    pub content: String,
    /// Wire type name; absent or empty means `text`
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    /// Raw client timestamp, parsed by the timestamp normalizer
    #[serde(default, deserialize_with = "timestamp::deserialize_raw")]
    pub timestamp: Option<String>,
}

impl NewItemInput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// A client-keyed entry for idempotent sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncItemInput {
    #[serde(default)]
    pub client_id: String,
    #[serde(flatten)]
    pub item: NewItemInput,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchInput {
    /// Originating device, recorded in logs only
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub items: Vec<NewItemInput>,
}

/// Partial update; absent or empty fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateItemInput {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_raw")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Lower bound on the logical timestamp, in any accepted timestamp form
    pub since: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub search: Option<String>,
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(ClipboardItem),
    Updated(ClipboardItem),
}

impl SyncOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, SyncOutcome::Created(_))
    }

    pub fn item(&self) -> &ClipboardItem {
        match self {
            SyncOutcome::Created(item) | SyncOutcome::Updated(item) => item,
        }
    }

    pub fn into_item(self) -> ClipboardItem {
        match self {
            SyncOutcome::Created(item) | SyncOutcome::Updated(item) => item,
        }
    }
}

impl From<UpsertOutcome> for SyncOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        if outcome.created {
            SyncOutcome::Created(outcome.item)
        } else {
            SyncOutcome::Updated(outcome.item)
        }
    }
}

/// One batch entry that was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Submitted content, shortened for the report
    pub content: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub synced: Vec<ClipboardItem>,
    pub failed: Vec<FailedItem>,
    /// Number of submitted items
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentItems {
    pub items: Vec<ClipboardItem>,
    /// All items the user owns, not just those returned
    pub total: i64,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Validated, sanitized fields ready for the store.
struct Prepared {
    content: String,
    item_type: ClipboardType,
    timestamp: DateTime<Utc>,
}

/// Why a single batch entry was rejected.
enum Rejection {
    Invalid(&'static str),
    Storage,
}

pub struct SyncReconciler<R: ClipboardRepository + ?Sized> {
    repository: Arc<R>,
    config: ReconcilerConfig,
}

impl<R: ClipboardRepository + ?Sized> SyncReconciler<R> {
    pub fn new(repository: Arc<R>, config: ReconcilerConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> ReconcilerConfig {
        self.config
    }

    /// Store a new item under a fresh id.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create(&self, user_id: &UserId, input: NewItemInput) -> Result<ClipboardItem> {
        let prepared = self.prepare(&input)?;
        let item = self
            .repository
            .insert(NewClipboardItem {
                user_id: *user_id,
                client_id: None,
                content: prepared.content,
                item_type: prepared.item_type,
                timestamp: prepared.timestamp,
            })
            .await
            .map_err(storage_failure)?;

        info!(item_id = %item.id, item_type = %item.item_type, "Clipboard item created");
        Ok(item)
    }

    /// Insert or overwrite the item keyed by `(user, client_id)`.
    ///
    /// # Errors
    /// [`SyncError::Validation`] when `client_id` is blank, plus the content
    /// and timestamp errors of [`SyncReconciler::create`].
    #[instrument(skip(self, input), fields(user_id = %user_id, client_id = %input.client_id))]
    pub async fn sync_item(&self, user_id: &UserId, input: SyncItemInput) -> Result<SyncOutcome> {
        let client_id = input.client_id.trim();
        if client_id.is_empty() {
            return Err(SyncError::Validation("client_id is required".to_string()));
        }

        let prepared = self.prepare(&input.item)?;
        let outcome = self
            .repository
            .upsert_by_client(NewClipboardItem {
                user_id: *user_id,
                client_id: Some(client_id.to_string()),
                content: prepared.content,
                item_type: prepared.item_type,
                timestamp: prepared.timestamp,
            })
            .await
            .map_err(storage_failure)?;

        let outcome = SyncOutcome::from(outcome);
        info!(
            item_id = %outcome.item().id,
            created = outcome.is_created(),
            "Clipboard item synced"
        );
        Ok(outcome)
    }

    /// Insert every valid entry, reporting the rest.
    ///
    /// Entries are processed sequentially in submission order. A failing
    /// entry never affects the others, and always-insert semantics apply:
    /// batch entries carry no dedup key.
    #[instrument(
        skip(self, input),
        fields(user_id = %user_id, device_id = input.device_id.as_deref().unwrap_or("-"), items = input.items.len())
    )]
    pub async fn batch_sync(&self, user_id: &UserId, input: BatchInput) -> Result<BatchReport> {
        if input.items.is_empty() {
            return Err(SyncError::Validation("no items to sync".to_string()));
        }

        let total = input.items.len();
        let mut synced = Vec::with_capacity(total);
        let mut failed = Vec::new();

        for (index, entry) in input.items.into_iter().enumerate() {
            match self.store_batch_entry(user_id, &entry).await {
                Ok(item) => synced.push(item),
                Err(rejection) => {
                    let reason = match rejection {
                        Rejection::Invalid(reason) => reason,
                        Rejection::Storage => "database error",
                    };
                    debug!(index, reason, "Batch entry rejected");
                    failed.push(FailedItem {
                        content: content::truncate_for_report(&entry.content, REPORT_PREVIEW_CHARS),
                        error: reason.to_string(),
                    });
                }
            }
        }

        info!(
            synced = synced.len(),
            failed = failed.len(),
            total,
            "Batch sync completed"
        );
        Ok(BatchReport {
            synced,
            failed,
            total,
        })
    }

    /// Page through the user's items, newest logical timestamp first.
    #[instrument(skip(self, query), fields(user_id = %user_id))]
    pub async fn list(&self, user_id: &UserId, query: ListQuery) -> Result<Page<ClipboardItem>> {
        let since = timestamp::normalize(query.since.as_deref())?;
        let item_type = match query.item_type.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(content::validate_type(raw)?),
        };
        let search = query.search.filter(|s| !s.is_empty());

        let filter = ItemFilter {
            since,
            item_type,
            search,
        };
        let page_request = PageRequest::from_params(query.page, query.page_size);

        let page = self
            .repository
            .query(user_id, &filter, page_request)
            .await
            .map_err(storage_failure)?;

        debug!(returned = page.items.len(), total = page.total, "Listed clipboard items");
        Ok(page)
    }

    pub async fn get(&self, user_id: &UserId, id: &ItemId) -> Result<ClipboardItem> {
        self.repository
            .find(user_id, id)
            .await
            .map_err(storage_failure)?
            .ok_or(SyncError::NotFound)
    }

    /// Apply a partial update to an owned item.
    #[instrument(skip(self, input), fields(user_id = %user_id, item_id = %id))]
    pub async fn update(
        &self,
        user_id: &UserId,
        id: &ItemId,
        input: UpdateItemInput,
    ) -> Result<ClipboardItem> {
        let mut changes = ItemChanges::default();

        if let Some(raw) = input.content.as_deref().filter(|c| !c.is_empty()) {
            content::validate_size(raw, self.config.max_content_bytes)?;
            changes.content = Some(content::sanitize(raw).into_owned());
        }
        if let Some(raw) = input.item_type.as_deref().filter(|t| !t.is_empty()) {
            changes.item_type = Some(content::validate_type(raw)?);
        }
        changes.timestamp = timestamp::normalize(input.timestamp.as_deref())?;

        let item = self
            .repository
            .update(user_id, id, changes)
            .await
            .map_err(storage_failure)?
            .ok_or(SyncError::NotFound)?;

        info!("Clipboard item updated");
        Ok(item)
    }

    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id))]
    pub async fn delete(&self, user_id: &UserId, id: &ItemId) -> Result<()> {
        let removed = self
            .repository
            .delete(user_id, id)
            .await
            .map_err(storage_failure)?;

        if !removed {
            return Err(SyncError::NotFound);
        }
        info!("Clipboard item deleted");
        Ok(())
    }

    /// The most recently touched item (greatest `updated_at`).
    pub async fn latest(&self, user_id: &UserId) -> Result<ClipboardItem> {
        self.repository
            .latest_updated(user_id)
            .await
            .map_err(storage_failure)?
            .ok_or(SyncError::NotFound)
    }

    /// The most recently created items, with the user's total item count.
    ///
    /// A missing or non-positive `limit` means [`DEFAULT_RECENT_LIMIT`];
    /// larger values are capped at [`MAX_RECENT_LIMIT`].
    pub async fn recent(&self, user_id: &UserId, limit: Option<i64>) -> Result<RecentItems> {
        let limit = clamp_recent_limit(limit);

        let items = self
            .repository
            .recent_created(user_id, limit)
            .await
            .map_err(storage_failure)?;
        let total = self
            .repository
            .count_for_user(user_id)
            .await
            .map_err(storage_failure)?;

        Ok(RecentItems { items, total })
    }

    fn prepare(&self, input: &NewItemInput) -> Result<Prepared> {
        content::validate_present(&input.content)?;
        content::validate_size(&input.content, self.config.max_content_bytes)?;
        let item_type = content::resolve_type(input.item_type.as_deref())?;
        let timestamp = timestamp::normalize(input.timestamp.as_deref())?.unwrap_or_else(now_micros);

        Ok(Prepared {
            content: content::sanitize(&input.content).into_owned(),
            item_type,
            timestamp,
        })
    }

    async fn store_batch_entry(
        &self,
        user_id: &UserId,
        entry: &NewItemInput,
    ) -> std::result::Result<ClipboardItem, Rejection> {
        let prepared = self.prepare(entry).map_err(|err| match err {
            SyncError::Content(content_err) => Rejection::Invalid(content_err.reason()),
            SyncError::Timestamp(_) => Rejection::Invalid("invalid timestamp"),
            _ => Rejection::Invalid("invalid item"),
        })?;

        self.repository
            .insert(NewClipboardItem {
                user_id: *user_id,
                client_id: None,
                content: prepared.content,
                item_type: prepared.item_type,
                timestamp: prepared.timestamp,
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store batch entry");
                Rejection::Storage
            })
    }
}

fn clamp_recent_limit(limit: Option<i64>) -> u32 {
    match limit {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(MAX_RECENT_LIMIT).min(MAX_RECENT_LIMIT),
        _ => DEFAULT_RECENT_LIMIT,
    }
}

fn storage_failure(err: core_library::LibraryError) -> SyncError {
    let err = SyncError::from(err);
    if let SyncError::Storage(inner) = &err {
        warn!(error = %inner, "Clipboard store operation failed");
    }
    err
}
