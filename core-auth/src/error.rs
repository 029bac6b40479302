use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token is not eligible for refresh yet ({remaining_secs}s remaining)")]
    NotRefreshable { remaining_secs: i64 },

    #[error("{0}")]
    Validation(String),

    #[error("Auth configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
