//! # Clipboard Sync Module
//!
//! Reconciles clipboard writes from many devices into one per-user history.
//!
//! ## Components
//!
//! - **Timestamp Normalizer** (`timestamp`): tolerant parsing of client times
//! - **Content Rules** (`content`): size/type validation and sanitization
//! - **Sync Reconciler** (`reconciler`): create, client-keyed upsert, batch
//!   sync with per-item failures, and owner-scoped queries
//! - **Statistics Aggregator** (`stats`): per-user counts and activity

pub mod content;
pub mod error;
pub mod reconciler;
pub mod stats;
pub mod timestamp;

pub use content::ContentError;
pub use error::{Result, SyncError};
pub use reconciler::{
    BatchInput, BatchReport, FailedItem, ListQuery, NewItemInput, ReconcilerConfig, RecentItems,
    SyncItemInput, SyncOutcome, SyncReconciler, UpdateItemInput,
};
pub use stats::{Statistics, StatisticsAggregator};
pub use timestamp::UnparseableTimestamp;
