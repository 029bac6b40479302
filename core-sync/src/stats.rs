//! Per-user clipboard statistics.
//!
//! Each figure comes from its own read query; a concurrent write may show up
//! in one figure and not another.

use crate::error::Result;
use chrono::{Duration, Utc};
use core_auth::UserId;
use core_library::models::DailyCount;
use core_library::repositories::ClipboardRepository;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Length of the activity window, in days, ending today.
pub const ACTIVITY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_items: i64,
    /// Every stored item counts as synced
    pub synced_items: i64,
    pub unsynced_items: i64,
    /// Sum of content sizes in bytes
    pub total_content_size: i64,
    pub type_distribution: BTreeMap<String, i64>,
    /// Items per day of logical timestamp, most recent day first
    pub recent_activity: Vec<DailyCount>,
}

pub struct StatisticsAggregator<R: ClipboardRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: ClipboardRepository + ?Sized> StatisticsAggregator<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn compute(&self, user_id: &UserId) -> Result<Statistics> {
        let total_items = self.repository.count_for_user(user_id).await?;
        let total_content_size = self.repository.total_content_bytes(user_id).await?;

        let type_distribution = self
            .repository
            .count_by_type(user_id)
            .await?
            .into_iter()
            .map(|tc| (tc.item_type, tc.count))
            .collect();

        let today = Utc::now().date_naive();
        let window_start = (today - Duration::days(ACTIVITY_WINDOW_DAYS - 1))
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        let recent_activity = self
            .repository
            .daily_counts_since(user_id, window_start)
            .await?;

        Ok(Statistics {
            total_items,
            synced_items: total_items,
            unsynced_items: 0,
            total_content_size,
            type_distribution,
            recent_activity,
        })
    }
}
