//! Store housekeeping: retention cleanup, compaction and usage figures.

use crate::error::{Result, ServiceError};
use chrono::{Duration, Utc};
use core_library::db::{self, PoolStats};
use core_library::repositories::{ClipboardRepository, UserRepository};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: i64,
    pub items: i64,
    pub pool: PoolStats,
}

pub struct Maintenance {
    pool: SqlitePool,
    users: Arc<dyn UserRepository>,
    items: Arc<dyn ClipboardRepository>,
}

impl Maintenance {
    pub fn new(
        pool: SqlitePool,
        users: Arc<dyn UserRepository>,
        items: Arc<dyn ClipboardRepository>,
    ) -> Self {
        Self { pool, users, items }
    }

    /// Delete every item created more than `days_old` days ago.
    ///
    /// Returns the number of items removed.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, days_old: u32) -> Result<u64> {
        if days_old == 0 {
            return Err(ServiceError::BadRequest(
                "cleanup age must be at least one day".to_string(),
            ));
        }

        let cutoff = Utc::now() - Duration::days(i64::from(days_old));
        let removed = self.items.delete_created_before(cutoff).await?;

        info!(removed, cutoff = %cutoff, "Removed old clipboard items");
        Ok(removed)
    }

    pub async fn vacuum(&self) -> Result<()> {
        db::vacuum(&self.pool).await?;
        Ok(())
    }

    pub async fn store_stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.users.count().await?,
            items: self.items.count_all().await?,
            pool: db::pool_stats(&self.pool),
        })
    }
}
