//! Content validation and sanitization for clipboard payloads.
//!
//! Sizes are measured in UTF-8 bytes; report truncation counts characters.

use core_library::models::ClipboardType;
use std::borrow::Cow;
use thiserror::Error;

/// Replacement for content that looks like a credential assignment.
pub const SENSITIVE_PLACEHOLDER: &str = "[SENSITIVE_CONTENT_HIDDEN]";

/// Content at or above this many bytes is never treated as a secret.
const SENSITIVE_MAX_BYTES: usize = 100;

const SENSITIVE_KEYWORDS: &[&str] = &["password", "passwd", "pwd", "secret", "token", "key", "auth"];

/// Length, in characters, of content echoed back in failure reports.
pub const REPORT_PREVIEW_CHARS: usize = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("content is required")]
    Empty,

    #[error("content too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("invalid content type: {0}")]
    InvalidType(String),
}

impl ContentError {
    /// Short reason used in batch failure reports.
    pub fn reason(&self) -> &'static str {
        match self {
            ContentError::Empty => "content is required",
            ContentError::TooLarge { .. } => "content too large",
            ContentError::InvalidType(_) => "invalid content type",
        }
    }
}

pub fn validate_present(content: &str) -> Result<(), ContentError> {
    if content.is_empty() {
        return Err(ContentError::Empty);
    }
    Ok(())
}

pub fn validate_size(content: &str, max_bytes: usize) -> Result<(), ContentError> {
    let size = content.len();
    if size > max_bytes {
        return Err(ContentError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Parse a wire type name; the empty string means `text`.
pub fn validate_type(raw: &str) -> Result<ClipboardType, ContentError> {
    if raw.is_empty() {
        return Ok(ClipboardType::default());
    }
    raw.parse()
        .map_err(|_| ContentError::InvalidType(raw.to_string()))
}

/// Like [`validate_type`], treating an absent value as empty.
pub fn resolve_type(raw: Option<&str>) -> Result<ClipboardType, ContentError> {
    validate_type(raw.unwrap_or_default())
}

/// Hide short `key=value` style content that mentions a credential keyword.
///
/// ```
/// use core_sync::content::{sanitize, SENSITIVE_PLACEHOLDER};
///
/// assert_eq!(sanitize("password=hunter2"), SENSITIVE_PLACEHOLDER);
/// assert_eq!(sanitize("shopping list: milk"), "shopping list: milk");
/// ```
pub fn sanitize(content: &str) -> Cow<'_, str> {
    if content.len() >= SENSITIVE_MAX_BYTES || !content.contains(['=', ':']) {
        return Cow::Borrowed(content);
    }

    let lower = content.to_lowercase();
    if SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Cow::Borrowed(SENSITIVE_PLACEHOLDER)
    } else {
        Cow::Borrowed(content)
    }
}

/// Shorten content to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_for_report(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = content.chars().take(keep).collect();
    out.push_str("...");
    out
}
