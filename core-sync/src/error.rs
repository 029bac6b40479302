use crate::content::ContentError;
use crate::timestamp::UnparseableTimestamp;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed caller input; the message is shown to the caller as-is
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Timestamp(#[from] UnparseableTimestamp),

    #[error("clipboard item not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(#[source] LibraryError),
}

impl From<LibraryError> for SyncError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::NotFound { .. } => SyncError::NotFound,
            LibraryError::InvalidInput { message, .. } => SyncError::Validation(message),
            other => SyncError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
