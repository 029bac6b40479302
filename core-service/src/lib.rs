//! Core service façade and bootstrap helpers.
//!
//! [`ClipboardCore`] opens the store described by a [`ServerConfig`], builds
//! the credential engine and token issuer from it, and hands out the three
//! services a transport layer needs:
//!
//! - [`AccountService`]: registration, login, tokens and passwords
//! - [`ClipboardService`]: clipboard operations for an authenticated caller
//! - [`Maintenance`]: retention cleanup and store figures
//!
//! ```rust,ignore
//! let config = ServerConfig::from_env()?;
//! let core = ClipboardCore::bootstrap(&config).await?;
//!
//! let identity = core.accounts().authenticate(Some(header))?;
//! let reply = core.clipboard().latest(&identity).await?;
//! ```

pub mod account;
pub mod clipboard;
pub mod error;
pub mod maintenance;

pub use account::{
    AccountService, AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse,
    RegisterRequest, TokenResponse, UserProfile,
};
pub use clipboard::{BatchResponse, ClipboardService, ItemResponse, RecentResponse, Reply};
pub use error::{ErrorBody, Result, ServiceError, StatusCategory};
pub use maintenance::{Maintenance, StoreStats};

use core_auth::{CredentialEngine, TokenIssuer};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{
    ClipboardRepository, SqliteClipboardRepository, SqliteUserRepository, UserRepository,
};
use core_runtime::ServerConfig;
use core_sync::ReconcilerConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Wired-up services sharing one connection pool.
#[derive(Clone)]
pub struct ClipboardCore {
    config: Arc<ServerConfig>,
    accounts: Arc<AccountService>,
    clipboard: Arc<ClipboardService>,
    maintenance: Arc<Maintenance>,
}

impl ClipboardCore {
    /// Validate `config`, open the database (running migrations) and build
    /// the services.
    pub async fn bootstrap(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let db_config = DatabaseConfig::new(&config.database_path)
            .max_connections(config.max_connections);
        let pool = create_pool(db_config)
            .await
            .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;

        let core = Self::from_pool(pool, config.clone())?;
        info!(
            database = %config.database_path.display(),
            "Clipboard core ready"
        );
        Ok(core)
    }

    /// Build the services over an existing, migrated pool.
    pub fn from_pool(pool: SqlitePool, config: ServerConfig) -> Result<Self> {
        let hashing = config.hashing;
        let credentials =
            CredentialEngine::with_params(hashing.memory_kib, hashing.iterations, hashing.parallelism)
                .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_lifetime_hours)
            .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;

        let users: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
        let items: Arc<dyn ClipboardRepository> =
            Arc::new(SqliteClipboardRepository::new(pool.clone()));

        let accounts = AccountService::new(Arc::clone(&users), credentials, Arc::new(tokens));
        let clipboard = ClipboardService::new(
            Arc::clone(&items),
            ReconcilerConfig {
                max_content_bytes: config.max_content_bytes,
            },
        );
        let maintenance = Maintenance::new(pool, users, items);

        Ok(Self {
            config: Arc::new(config),
            accounts: Arc::new(accounts),
            clipboard: Arc::new(clipboard),
            maintenance: Arc::new(maintenance),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn clipboard(&self) -> &ClipboardService {
        &self.clipboard
    }

    pub fn maintenance(&self) -> &Maintenance {
        &self.maintenance
    }
}
