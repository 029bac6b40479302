//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the clipboard sync core:
//! - Logging and tracing infrastructure
//! - Server configuration with fail-fast validation
//!
//! ## Overview
//!
//! Every other crate in the workspace depends on this one for its logging
//! conventions and for the read-only [`config::ServerConfig`] assembled at
//! startup.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{HashingConfig, ServerConfig};
pub use error::{Error, Result};
