//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for data access.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository so higher layers can
//!   be tested against mocks
//! - SQLite implementations use sqlx for async database access
//! - Pagination is supported via the `Page<T>` wrapper
//!
//! ## Available Repositories
//!
//! - `UserRepository` - accounts, credentials and the stored session token
//! - `ClipboardRepository` - clipboard items, upserts, listings and aggregates

pub mod clipboard;
pub mod pagination;
pub mod user;

pub use clipboard::{ClipboardRepository, ItemFilter, SqliteClipboardRepository};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use user::{SqliteUserRepository, UserRepository};
