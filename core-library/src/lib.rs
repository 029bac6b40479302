//! # Clipboard Store Module
//!
//! Owns the SQLite schema for users and clipboard items and provides
//! repository patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite pool creation and embedded migrations
//! - Domain models and their row mappings
//! - `UserRepository` and `ClipboardRepository` traits with SQLite
//!   implementations, including the atomic client-id upsert, filtered
//!   pagination and store-side aggregates

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{ClipboardItem, ClipboardType, ItemId, NewClipboardItem, User};
