//! Input rules for account fields.
//!
//! Lengths are counted in characters. Each check returns the message shown
//! to the caller on failure.

use crate::error::{AuthError, Result};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 100;

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(invalid("username cannot be empty"));
    }

    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(invalid("username must be between 3 and 50 characters"));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "username can only contain letters, numbers, underscores and hyphens",
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(invalid("email cannot be empty"));
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("invalid email format")),
    };

    if local.is_empty() || domain.is_empty() {
        return Err(invalid("invalid email format"));
    }

    if !domain.contains('.') {
        return Err(invalid("invalid email domain"));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(invalid("password cannot be empty"));
    }

    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(invalid("password must be at least 6 characters"));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(invalid("password must be at most 100 characters"));
    }

    Ok(())
}

fn invalid(message: &str) -> AuthError {
    AuthError::Validation(message.to_string())
}
