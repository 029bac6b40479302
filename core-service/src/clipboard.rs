//! Clipboard operations for an authenticated caller.
//!
//! Every method takes the caller's [`AuthIdentity`] first; item access is
//! always scoped to that user. Results come back as a [`Reply`] carrying
//! the suggested status alongside the body.

use crate::account::MessageResponse;
use crate::error::{Result, ServiceError, StatusCategory};
use chrono::{DateTime, Utc};
use core_auth::AuthIdentity;
use core_library::models::ItemId;
use core_library::repositories::{ClipboardRepository, Page};
use core_library::{ClipboardItem, ClipboardType};
use core_sync::{
    BatchInput, BatchReport, FailedItem, ListQuery, NewItemInput, ReconcilerConfig, Statistics,
    StatisticsAggregator, SyncItemInput, SyncOutcome, SyncReconciler, UpdateItemInput,
};
use serde::Serialize;
use std::sync::Arc;

/// A successful result with its status category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply<T> {
    pub status: StatusCategory,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCategory::Ok,
            body,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            status: StatusCategory::Created,
            body,
        }
    }
}

/// An item as returned to clients; the owner is implied by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub item_type: ClipboardType,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClipboardItem> for ItemResponse {
    fn from(item: ClipboardItem) -> Self {
        Self {
            id: item.id.to_string(),
            client_id: item.client_id,
            content: item.content,
            item_type: item.item_type,
            timestamp: item.timestamp,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResponse {
    pub synced: Vec<ItemResponse>,
    pub failed: Vec<FailedItem>,
    pub total: usize,
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            synced: report.synced.into_iter().map(ItemResponse::from).collect(),
            failed: report.failed,
            total: report.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentResponse {
    pub items: Vec<ItemResponse>,
    pub total: i64,
}

pub struct ClipboardService {
    reconciler: SyncReconciler<dyn ClipboardRepository>,
    stats: StatisticsAggregator<dyn ClipboardRepository>,
}

impl ClipboardService {
    pub fn new(repository: Arc<dyn ClipboardRepository>, config: ReconcilerConfig) -> Self {
        Self {
            reconciler: SyncReconciler::new(Arc::clone(&repository), config),
            stats: StatisticsAggregator::new(repository),
        }
    }

    pub async fn create(
        &self,
        identity: &AuthIdentity,
        input: NewItemInput,
    ) -> Result<Reply<ItemResponse>> {
        let item = self.reconciler.create(&identity.user_id, input).await?;
        Ok(Reply::created(item.into()))
    }

    /// `Created` for a first sync of a client id, `Ok` for a repeat.
    pub async fn sync(
        &self,
        identity: &AuthIdentity,
        input: SyncItemInput,
    ) -> Result<Reply<ItemResponse>> {
        Ok(match self.reconciler.sync_item(&identity.user_id, input).await? {
            SyncOutcome::Created(item) => Reply::created(item.into()),
            SyncOutcome::Updated(item) => Reply::ok(item.into()),
        })
    }

    pub async fn batch_sync(
        &self,
        identity: &AuthIdentity,
        input: BatchInput,
    ) -> Result<Reply<BatchResponse>> {
        let report = self.reconciler.batch_sync(&identity.user_id, input).await?;
        Ok(Reply::ok(report.into()))
    }

    pub async fn list(
        &self,
        identity: &AuthIdentity,
        query: ListQuery,
    ) -> Result<Reply<Page<ItemResponse>>> {
        let page = self.reconciler.list(&identity.user_id, query).await?;
        Ok(Reply::ok(page.map(ItemResponse::from)))
    }

    pub async fn get(&self, identity: &AuthIdentity, id: &str) -> Result<Reply<ItemResponse>> {
        let id = parse_item_id(id)?;
        let item = self.reconciler.get(&identity.user_id, &id).await?;
        Ok(Reply::ok(item.into()))
    }

    pub async fn update(
        &self,
        identity: &AuthIdentity,
        id: &str,
        input: UpdateItemInput,
    ) -> Result<Reply<ItemResponse>> {
        let id = parse_item_id(id)?;
        let item = self.reconciler.update(&identity.user_id, &id, input).await?;
        Ok(Reply::ok(item.into()))
    }

    pub async fn delete(&self, identity: &AuthIdentity, id: &str) -> Result<Reply<MessageResponse>> {
        let id = parse_item_id(id)?;
        self.reconciler.delete(&identity.user_id, &id).await?;
        Ok(Reply::ok(MessageResponse::new("clipboard item deleted")))
    }

    pub async fn latest(&self, identity: &AuthIdentity) -> Result<Reply<ItemResponse>> {
        let item = self.reconciler.latest(&identity.user_id).await?;
        Ok(Reply::ok(item.into()))
    }

    pub async fn recent(
        &self,
        identity: &AuthIdentity,
        limit: Option<i64>,
    ) -> Result<Reply<RecentResponse>> {
        let recent = self.reconciler.recent(&identity.user_id, limit).await?;
        Ok(Reply::ok(RecentResponse {
            items: recent.items.into_iter().map(ItemResponse::from).collect(),
            total: recent.total,
        }))
    }

    pub async fn statistics(&self, identity: &AuthIdentity) -> Result<Reply<Statistics>> {
        let stats = self.stats.compute(&identity.user_id).await?;
        Ok(Reply::ok(stats))
    }
}

/// Malformed ids are reported exactly like ids that do not exist.
fn parse_item_id(raw: &str) -> Result<ItemId> {
    ItemId::from_string(raw.trim())
        .map_err(|_| ServiceError::NotFound("clipboard item not found".to_string()))
}
