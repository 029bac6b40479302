use core_auth::AuthError;
use core_library::LibraryError;
use core_sync::{ContentError, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Message returned for every storage or internal failure.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Outcome class of a service call, mirroring HTTP status semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Ok,
    Created,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    PayloadTooLarge,
    Internal,
}

impl StatusCategory {
    /// Equivalent HTTP status code.
    pub fn code(&self) -> u16 {
        match self {
            StatusCategory::Ok => 200,
            StatusCategory::Created => 201,
            StatusCategory::BadRequest => 400,
            StatusCategory::Unauthorized => 401,
            StatusCategory::Forbidden => 403,
            StatusCategory::NotFound => 404,
            StatusCategory::Conflict => 409,
            StatusCategory::PayloadTooLarge => 413,
            StatusCategory::Internal => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusCategory::Ok | StatusCategory::Created)
    }

    fn label(&self) -> &'static str {
        match self {
            StatusCategory::Ok => "ok",
            StatusCategory::Created => "created",
            StatusCategory::BadRequest => "bad request",
            StatusCategory::Unauthorized => "unauthorized",
            StatusCategory::Forbidden => "forbidden",
            StatusCategory::NotFound => "not found",
            StatusCategory::Conflict => "conflict",
            StatusCategory::PayloadTooLarge => "payload too large",
            StatusCategory::Internal => "internal error",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.label())
    }
}

/// Error payload handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Detail is logged where the failure happens, never returned.
    #[error("internal server error")]
    Internal,

    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),
}

impl ServiceError {
    /// Log `detail` and produce the opaque internal error.
    pub fn internal(detail: impl fmt::Display) -> Self {
        error!(error = %detail, "Internal failure");
        ServiceError::Internal
    }

    pub fn status(&self) -> StatusCategory {
        match self {
            ServiceError::BadRequest(_) => StatusCategory::BadRequest,
            ServiceError::Unauthorized(_) => StatusCategory::Unauthorized,
            ServiceError::Forbidden(_) => StatusCategory::Forbidden,
            ServiceError::NotFound(_) => StatusCategory::NotFound,
            ServiceError::Conflict(_) => StatusCategory::Conflict,
            ServiceError::PayloadTooLarge(_) => StatusCategory::PayloadTooLarge,
            ServiceError::Internal | ServiceError::InitializationFailed(_) => {
                StatusCategory::Internal
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        let message = match self {
            ServiceError::Internal | ServiceError::InitializationFailed(_) => {
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        ErrorBody {
            error: self.status().label().to_string(),
            message,
        }
    }
}

impl From<SyncError> for ServiceError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Validation(msg) => ServiceError::BadRequest(msg),
            SyncError::Content(content @ ContentError::TooLarge { .. }) => {
                ServiceError::PayloadTooLarge(content.to_string())
            }
            SyncError::Content(content) => ServiceError::BadRequest(content.to_string()),
            SyncError::Timestamp(ts) => ServiceError::BadRequest(ts.to_string()),
            SyncError::NotFound => ServiceError::NotFound("clipboard item not found".to_string()),
            SyncError::Storage(inner) => ServiceError::internal(inner),
        }
    }
}

impl From<LibraryError> for ServiceError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Conflict { field } => {
                ServiceError::Conflict(format!("{} already exists", field))
            }
            LibraryError::NotFound { entity_type, .. } => {
                ServiceError::NotFound(format!("{} not found", entity_type.to_lowercase()))
            }
            LibraryError::InvalidInput { message, .. } => ServiceError::BadRequest(message),
            other => ServiceError::internal(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ServiceError::BadRequest(msg),
            AuthError::InvalidToken(_) => {
                ServiceError::Unauthorized("invalid or expired token".to_string())
            }
            AuthError::NotRefreshable { .. } => ServiceError::Unauthorized(err.to_string()),
            AuthError::Hashing(_) | AuthError::Config(_) => ServiceError::internal(err),
        }
    }
}

impl From<core_runtime::Error> for ServiceError {
    fn from(err: core_runtime::Error) -> Self {
        ServiceError::InitializationFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCategory::Created.code(), 201);
        assert_eq!(StatusCategory::PayloadTooLarge.code(), 413);
        assert!(StatusCategory::Ok.is_success());
        assert!(!StatusCategory::NotFound.is_success());
    }

    #[test]
    fn test_sync_errors_map_to_categories() {
        let too_large: ServiceError =
            SyncError::Content(ContentError::TooLarge { size: 10, limit: 5 }).into();
        assert_eq!(too_large.status(), StatusCategory::PayloadTooLarge);

        let bad_type: ServiceError =
            SyncError::Content(ContentError::InvalidType("video".into())).into();
        assert_eq!(bad_type.status(), StatusCategory::BadRequest);

        let missing: ServiceError = SyncError::NotFound.into();
        assert_eq!(missing.status(), StatusCategory::NotFound);
    }

    #[test]
    fn test_storage_errors_are_opaque() {
        let err: ServiceError =
            SyncError::Storage(LibraryError::Migration("table users is locked".into())).into();
        assert_eq!(err, ServiceError::Internal);

        let body = err.body();
        assert_eq!(body.error, "internal error");
        assert_eq!(body.message, INTERNAL_MESSAGE);
        assert!(!body.message.contains("users"));

        let corrupt: ServiceError = LibraryError::CorruptRow {
            field: "users.id".into(),
            message: "invalid character".into(),
        }
        .into();
        assert_eq!(corrupt, ServiceError::Internal);
    }

    #[test]
    fn test_library_conflict_names_the_field() {
        let err: ServiceError = LibraryError::Conflict {
            field: "email".into(),
        }
        .into();
        assert_eq!(err, ServiceError::Conflict("email already exists".into()));
    }

    #[test]
    fn test_auth_errors() {
        let err: ServiceError = AuthError::InvalidToken("ExpiredSignature".into()).into();
        assert_eq!(err.body().message, "invalid or expired token");
        assert_eq!(err.status(), StatusCategory::Unauthorized);

        let err: ServiceError = AuthError::Validation("password too short".into()).into();
        assert_eq!(err.status(), StatusCategory::BadRequest);
    }
}
