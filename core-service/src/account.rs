//! # Account Service
//!
//! Registration, login, session tokens and password management.
//!
//! Password hashing is CPU-bound, so every hash or verify runs on the
//! blocking pool.
//!
//! ## Legacy credential upgrade
//!
//! Accounts created before per-user salts carry an empty salt. When such an
//! account logs in successfully, a fresh salt and salted hash are computed
//! from the plaintext and stored before the response is returned. Failing to
//! upgrade is logged and does not fail the login; the next login retries.

use crate::error::{Result, ServiceError};
use chrono::{DateTime, Utc};
use core_auth::validation::{validate_email, validate_password, validate_username};
use core_auth::{
    strip_bearer, AuthIdentity, CredentialCheck, CredentialEngine, IssuedToken, SaltedCredential,
    TokenIssuer, UserId,
};
use core_library::models::NewUser;
use core_library::repositories::UserRepository;
use core_library::User;
use core_runtime::logging::redact_if_sensitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const INVALID_CREDENTIALS: &str = "invalid credentials";

// =============================================================================
// Requests and responses
// =============================================================================

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `username` may also be the account's email address.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangePasswordRequest { .. }")
    }
}

/// Public view of an account; never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    credentials: CredentialEngine,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: CredentialEngine,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            credentials,
            tokens,
        }
    }

    /// Create an account and open a session for it.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        validate_username(&request.username)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(ServiceError::Conflict("username already exists".to_string()));
        }
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::Conflict("email already exists".to_string()));
        }

        let credential = self.new_credential(request.password).await?;
        let user = self
            .users
            .insert(NewUser {
                username: request.username,
                email: request.email,
                password_hash: credential.hash,
                salt: credential.salt,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        self.open_session(&user).await
    }

    /// Verify credentials and open a session.
    #[instrument(
        skip(self, request),
        fields(login = %redact_if_sensitive("login", &request.username))
    )]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let user = self
            .users
            .find_by_login(&request.username)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Forbidden("account is disabled".to_string()));
        }

        let check = self
            .check_password(request.password.clone(), user.salt.clone(), user.password_hash.clone())
            .await?;
        if !check.is_match() {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if check.needs_upgrade() {
            self.upgrade_legacy_credential(&user, request.password).await;
        }

        info!(user_id = %user.id, "User logged in");
        self.open_session(&user).await
    }

    /// Exchange a token in its final hour for a fresh one.
    pub async fn refresh(&self, authorization: Option<&str>) -> Result<TokenResponse> {
        self.refresh_at(authorization, Utc::now()).await
    }

    /// [`AccountService::refresh`] against an explicit clock.
    #[instrument(skip_all)]
    pub async fn refresh_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse> {
        let token = bearer_token(authorization)?;
        let issued = self.tokens.refresh_at(token, now)?;
        let identity = self.tokens.verify_at(&issued.token, now)?.identity()?;

        self.users
            .set_token(&identity.user_id, Some(&issued.token))
            .await?;

        info!(user_id = %identity.user_id, "Session token refreshed");
        Ok(TokenResponse::from(issued))
    }

    /// Forget the stored session token.
    ///
    /// Tokens are stateless, so a copy held elsewhere stays valid until it
    /// expires.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn logout(&self, identity: &AuthIdentity) -> Result<MessageResponse> {
        self.users.set_token(&identity.user_id, None).await?;
        info!("User logged out");
        Ok(MessageResponse::new("logout successful"))
    }

    pub async fn profile(&self, identity: &AuthIdentity) -> Result<UserProfile> {
        let user = self.require_user(&identity.user_id).await?;
        Ok(UserProfile::from(&user))
    }

    #[instrument(skip(self, identity, request), fields(user_id = %identity.user_id))]
    pub async fn change_password(
        &self,
        identity: &AuthIdentity,
        request: ChangePasswordRequest,
    ) -> Result<MessageResponse> {
        validate_password(&request.new_password)?;
        let user = self.require_user(&identity.user_id).await?;

        let check = self
            .check_password(request.current_password, user.salt.clone(), user.password_hash.clone())
            .await?;
        if !check.is_match() {
            return Err(ServiceError::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }

        let credential = self.new_credential(request.new_password).await?;
        self.users
            .update_credentials(&user.id, &credential.salt, &credential.hash)
            .await?;

        info!("Password changed");
        Ok(MessageResponse::new("password changed successfully"))
    }

    /// Administrative reset; no knowledge of the old password required.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(&self, username: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound("user not found".to_string()))?;

        let credential = self.new_credential(new_password.to_string()).await?;
        self.users
            .update_credentials(&user.id, &credential.salt, &credential.hash)
            .await?;

        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Resolve the caller from an `Authorization` header value.
    ///
    /// Only the token is consulted; the store is never touched.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AuthIdentity> {
        let token = bearer_token(authorization)?;
        self.tokens.authenticate(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            ServiceError::Unauthorized("invalid or expired token".to_string())
        })
    }

    async fn open_session(&self, user: &User) -> Result<AuthResponse> {
        let identity = AuthIdentity::new(user.id, user.username.clone(), user.email.clone());
        let issued = self.tokens.issue(&identity)?;
        self.users.set_token(&user.id, Some(&issued.token)).await?;

        Ok(AuthResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: UserProfile::from(user),
        })
    }

    async fn upgrade_legacy_credential(&self, user: &User, password: String) {
        let credential = match self.new_credential(password).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Could not hash upgraded credential");
                return;
            }
        };

        match self
            .users
            .update_credentials(&user.id, &credential.salt, &credential.hash)
            .await
        {
            Ok(()) => info!(user_id = %user.id, "Legacy credential upgraded to salted hash"),
            Err(e) => warn!(user_id = %user.id, error = %e, "Could not store upgraded credential"),
        }
    }

    async fn require_user(&self, id: &UserId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("user not found".to_string()))
    }

    async fn new_credential(&self, password: String) -> Result<SaltedCredential> {
        let engine = self.credentials.clone();
        run_blocking(move || engine.new_credential(&password))
            .await?
            .map_err(ServiceError::from)
    }

    async fn check_password(
        &self,
        password: String,
        salt: String,
        hash: String,
    ) -> Result<CredentialCheck> {
        let engine = self.credentials.clone();
        run_blocking(move || engine.check(&password, &salt, &hash)).await
    }
}

fn bearer_token(authorization: Option<&str>) -> Result<&str> {
    authorization
        .map(strip_bearer)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization header".to_string()))
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ServiceError::internal)
}
