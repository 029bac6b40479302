//! # Server Configuration
//!
//! Process-wide settings for the clipboard sync core.
//!
//! ## Overview
//!
//! A [`ServerConfig`] is assembled once at startup, either through
//! [`ServerConfig::builder`] or from the environment with
//! [`ServerConfig::from_env`], and is read-only afterwards. Both paths end in
//! [`ServerConfig::validate`] so a misconfigured process fails before it
//! touches the store.
//!
//! ## Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `JWT_SECRET` | development secret (a warning is logged) |
//! | `JWT_EXPIRE_HOUR` | `168` |
//! | `DB_PATH` | `data/clipboard.db` |
//! | `DB_MAX_CONNECTIONS` | `5` |
//! | `MAX_CONTENT_SIZE` | `1048576` bytes |
//! | `CLEANUP_DAYS` | `30` |
//! | `LOG_LEVEL` / `LOG_FORMAT` | `info` / build-dependent |
//! | `HASH_MEMORY_KIB`, `HASH_ITERATIONS`, `HASH_PARALLELISM` | Argon2 defaults |
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .database_path("/tmp/clipboard.db")
//!     .jwt_secret("a-long-random-secret")
//!     .max_content_bytes(512 * 1024)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.token_lifetime_hours, 168);
//! ```

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Signing secret used when nothing else is configured. Never for production.
pub const DEVELOPMENT_JWT_SECRET: &str = "clipboard-sync-secret-key-change-in-production";

pub const DEFAULT_TOKEN_LIFETIME_HOURS: u32 = 24 * 7;
pub const DEFAULT_DATABASE_PATH: &str = "data/clipboard.db";
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_CLEANUP_DAYS: u32 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Cost parameters for the slow password hash.
///
/// Defaults match Argon2's recommended parameters (19 MiB, 2 passes, 1 lane).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Settings shared by every component of the core.
#[derive(Clone)]
pub struct ServerConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Upper bound on pooled store connections
    pub max_connections: u32,

    /// HMAC secret for session tokens
    pub jwt_secret: String,

    /// Session token lifetime
    pub token_lifetime_hours: u32,

    /// Largest accepted clipboard payload, in bytes
    pub max_content_bytes: usize,

    /// Age after which the maintenance cleanup removes items
    pub cleanup_days: u32,

    pub hashing: HashingConfig,

    pub logging: LoggingConfig,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_path", &self.database_path)
            .field("max_connections", &self.max_connections)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_lifetime_hours", &self.token_lifetime_hours)
            .field("max_content_bytes", &self.max_content_bytes)
            .field("cleanup_days", &self.cleanup_days)
            .field("hashing", &self.hashing)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Prefix for environment variables owned by this service.
pub const ENV_PREFIX: &str = "CLIPSYNC_";

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::Config(format!("Failed to read .env file: {}", e)));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Each setting is read as `CLIPSYNC_<NAME>` first, then as the bare
    /// `<NAME>`. Missing keys fall back to defaults; malformed values are
    /// errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get = |key: &str| non_blank(&format!("{}{}", ENV_PREFIX, key)).or_else(|| non_blank(key));

        let mut builder = ServerConfig::builder();

        if let Some(secret) = get("JWT_SECRET") {
            builder = builder.jwt_secret(secret);
        }
        if let Some(path) = get("DB_PATH") {
            builder = builder.database_path(path);
        }
        if let Some(hours) = get("JWT_EXPIRE_HOUR") {
            builder = builder.token_lifetime_hours(parse_number("JWT_EXPIRE_HOUR", &hours)?);
        }
        if let Some(size) = get("MAX_CONTENT_SIZE") {
            builder = builder.max_content_bytes(parse_number("MAX_CONTENT_SIZE", &size)?);
        }
        if let Some(days) = get("CLEANUP_DAYS") {
            builder = builder.cleanup_days(parse_number("CLEANUP_DAYS", &days)?);
        }
        if let Some(max) = get("DB_MAX_CONNECTIONS") {
            builder = builder.max_connections(parse_number("DB_MAX_CONNECTIONS", &max)?);
        }

        let mut hashing = HashingConfig::default();
        if let Some(v) = get("HASH_MEMORY_KIB") {
            hashing.memory_kib = parse_number("HASH_MEMORY_KIB", &v)?;
        }
        if let Some(v) = get("HASH_ITERATIONS") {
            hashing.iterations = parse_number("HASH_ITERATIONS", &v)?;
        }
        if let Some(v) = get("HASH_PARALLELISM") {
            hashing.parallelism = parse_number("HASH_PARALLELISM", &v)?;
        }
        builder = builder.hashing(hashing);

        let mut logging = LoggingConfig::default();
        if let Some(level) = get("LOG_LEVEL") {
            logging = logging.with_level(level.parse::<LogLevel>()?);
        }
        if let Some(format) = get("LOG_FORMAT") {
            logging = logging.with_format(format.parse::<LogFormat>()?);
        }
        if let Some(filter) = get("RUST_LOG") {
            logging = logging.with_filter(filter);
        }
        builder = builder.logging(logging);

        builder.build()
    }

    /// Fail fast on values that would break the core at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.jwt_secret.trim().is_empty() {
            return Err(Error::Config("JWT secret cannot be empty".to_string()));
        }

        if self.token_lifetime_hours == 0 {
            return Err(Error::Config(
                "Token lifetime must be at least one hour".to_string(),
            ));
        }

        if self.max_content_bytes == 0 {
            return Err(Error::Config(
                "Maximum content size must be greater than 0 bytes".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "Connection pool must allow at least one connection".to_string(),
            ));
        }

        let h = &self.hashing;
        if h.iterations == 0 || h.parallelism == 0 || h.memory_kib < 8 * h.parallelism {
            return Err(Error::Config(format!(
                "Invalid password hashing parameters: memory={}KiB iterations={} parallelism={}",
                h.memory_kib, h.iterations, h.parallelism
            )));
        }

        Ok(())
    }

    /// Whether the built-in development secret is in use.
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

/// Builder for [`ServerConfig`].
#[derive(Default)]
pub struct ServerConfigBuilder {
    database_path: Option<PathBuf>,
    max_connections: Option<u32>,
    jwt_secret: Option<String>,
    token_lifetime_hours: Option<u32>,
    max_content_bytes: Option<usize>,
    cleanup_days: Option<u32>,
    hashing: Option<HashingConfig>,
    logging: Option<LoggingConfig>,
}

impl ServerConfigBuilder {
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    pub fn token_lifetime_hours(mut self, hours: u32) -> Self {
        self.token_lifetime_hours = Some(hours);
        self
    }

    pub fn max_content_bytes(mut self, bytes: usize) -> Self {
        self.max_content_bytes = Some(bytes);
        self
    }

    pub fn cleanup_days(mut self, days: u32) -> Self {
        self.cleanup_days = Some(days);
        self
    }

    pub fn hashing(mut self, hashing: HashingConfig) -> Self {
        self.hashing = Some(hashing);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ServerConfig> {
        let config = ServerConfig {
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            jwt_secret: self
                .jwt_secret
                .unwrap_or_else(|| DEVELOPMENT_JWT_SECRET.to_string()),
            token_lifetime_hours: self
                .token_lifetime_hours
                .unwrap_or(DEFAULT_TOKEN_LIFETIME_HOURS),
            max_content_bytes: self.max_content_bytes.unwrap_or(DEFAULT_MAX_CONTENT_BYTES),
            cleanup_days: self.cleanup_days.unwrap_or(DEFAULT_CLEANUP_DAYS),
            hashing: self.hashing.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        if config.uses_development_secret() {
            warn!("JWT_SECRET is not set; using the development signing secret");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::builder().build().unwrap();

        assert_eq!(config.database_path, PathBuf::from("data/clipboard.db"));
        assert_eq!(config.token_lifetime_hours, 168);
        assert_eq!(config.max_content_bytes, 1024 * 1024);
        assert_eq!(config.cleanup_days, 30);
        assert!(config.uses_development_secret());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::builder()
            .database_path("/tmp/clip.db")
            .jwt_secret("s3cr3t")
            .token_lifetime_hours(1)
            .max_content_bytes(10)
            .cleanup_days(7)
            .max_connections(2)
            .build()
            .unwrap();

        assert_eq!(config.jwt_secret, "s3cr3t");
        assert_eq!(config.token_lifetime_hours, 1);
        assert_eq!(config.max_content_bytes, 10);
        assert_eq!(config.cleanup_days, 7);
        assert_eq!(config.max_connections, 2);
        assert!(!config.uses_development_secret());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(matches!(
            ServerConfig::builder().jwt_secret("  ").build(),
            Err(Error::Config(_))
        ));
        assert!(ServerConfig::builder().token_lifetime_hours(0).build().is_err());
        assert!(ServerConfig::builder().max_content_bytes(0).build().is_err());
        assert!(ServerConfig::builder().max_connections(0).build().is_err());
        assert!(ServerConfig::builder().database_path("").build().is_err());
        assert!(ServerConfig::builder()
            .hashing(HashingConfig {
                memory_kib: 19 * 1024,
                iterations: 0,
                parallelism: 1,
            })
            .build()
            .is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "from-env"),
            ("JWT_EXPIRE_HOUR", "24"),
            ("DB_PATH", "/var/lib/clip.db"),
            ("MAX_CONTENT_SIZE", "2048"),
            ("CLEANUP_DAYS", "14"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.token_lifetime_hours, 24);
        assert_eq!(config.database_path, PathBuf::from("/var/lib/clip.db"));
        assert_eq!(config.max_content_bytes, 2048);
        assert_eq!(config.cleanup_days, 14);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_prefixed_names_take_precedence() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("CLIPSYNC_JWT_SECRET", "prefixed"),
            ("JWT_SECRET", "legacy"),
            ("CLIPSYNC_DB_PATH", "/srv/clip.db"),
            ("CLIPSYNC_CLEANUP_DAYS", " "),
            ("CLEANUP_DAYS", "7"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_secret, "prefixed");
        assert_eq!(config.database_path, PathBuf::from("/srv/clip.db"));
        assert_eq!(config.cleanup_days, 7);
    }

    #[test]
    fn test_from_lookup_rejects_malformed_numbers() {
        let err = ServerConfig::from_lookup(lookup_from(&[("JWT_EXPIRE_HOUR", "a week")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRE_HOUR"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[("DB_PATH", "  ")])).unwrap();
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = ServerConfig::builder().jwt_secret("hunter2").build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }
}
