//! Domain models for users and clipboard items
//!
//! Domain types carry `chrono` instants and typed ids; the `*Row` structs
//! mirror the SQLite columns (text ids, integer microsecond timestamps) and
//! convert into domain types through `TryFrom`.

use crate::error::{LibraryError, Result};
use chrono::{DateTime, Utc};
use core_auth::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a clipboard item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// =============================================================================
// Time conversion
// =============================================================================

/// Storage representation of an instant: Unix microseconds.
pub fn to_micros(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_micros()
}

pub fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| LibraryError::CorruptRow {
        field: "timestamp".to_string(),
        message: format!("{} is outside the representable range", micros),
    })
}

/// Current time truncated to the precision the store keeps.
pub fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

// =============================================================================
// Clipboard type
// =============================================================================

/// Kind of clipboard payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardType {
    #[default]
    Text,
    Image,
    File,
}

impl ClipboardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardType::Text => "text",
            ClipboardType::Image => "image",
            ClipboardType::File => "file",
        }
    }
}

impl fmt::Display for ClipboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClipboardType {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ClipboardType::Text),
            "image" => Ok(ClipboardType::Image),
            "file" => Ok(ClipboardType::File),
            other => Err(LibraryError::InvalidInput {
                field: "type".to_string(),
                message: format!("unsupported content type '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A user account as stored.
///
/// `salt` is empty for accounts still on the legacy unsalted scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub token: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_legacy(&self) -> bool {
        self.salt.is_empty()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields for a user insert.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub token: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = LibraryError;

    fn try_from(row: UserRow) -> Result<Self> {
        let id = UserId::from_string(&row.id).map_err(|e| LibraryError::CorruptRow {
            field: "users.id".to_string(),
            message: e.to_string(),
        })?;

        Ok(User {
            id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            salt: row.salt,
            token: row.token,
            is_active: row.is_active,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

// =============================================================================
// Clipboard items
// =============================================================================

/// A clipboard entry owned by one user.
///
/// `timestamp` is the client-asserted event time used for ordering and
/// filtering; `created_at`/`updated_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub id: ItemId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub item_type: ClipboardType,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for an item insert or upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClipboardItem {
    pub user_id: UserId,
    pub client_id: Option<String>,
    pub content: String,
    pub item_type: ClipboardType,
    pub timestamp: DateTime<Utc>,
}

/// Partial update of an item; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub content: Option<String>,
    pub item_type: Option<ClipboardType>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Result of a client-id keyed upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub item: ClipboardItem,
    /// `true` when a new row was inserted, `false` when an existing one changed
    pub created: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClipboardItemRow {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub content: String,
    pub item_type: String,
    pub timestamp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<ClipboardItemRow> for ClipboardItem {
    type Error = LibraryError;

    fn try_from(row: ClipboardItemRow) -> Result<Self> {
        let id = ItemId::from_string(&row.id).map_err(|e| LibraryError::CorruptRow {
            field: "clipboard_items.id".to_string(),
            message: e.to_string(),
        })?;
        let user_id = UserId::from_string(&row.user_id).map_err(|e| LibraryError::CorruptRow {
            field: "clipboard_items.user_id".to_string(),
            message: e.to_string(),
        })?;

        Ok(ClipboardItem {
            id,
            user_id,
            client_id: row.client_id,
            content: row.content,
            item_type: row.item_type.parse().map_err(|_| LibraryError::CorruptRow {
                field: "clipboard_items.item_type".to_string(),
                message: format!("unknown type '{}'", row.item_type),
            })?,
            timestamp: from_micros(row.timestamp)?,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Item count for one clipboard type.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TypeCount {
    pub item_type: String,
    pub count: i64,
}

/// Item count for one calendar day (`YYYY-MM-DD`, UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clipboard_type_parse() {
        assert_eq!("text".parse::<ClipboardType>().unwrap(), ClipboardType::Text);
        assert_eq!("image".parse::<ClipboardType>().unwrap(), ClipboardType::Image);
        assert_eq!("file".parse::<ClipboardType>().unwrap(), ClipboardType::File);
        assert!("video".parse::<ClipboardType>().is_err());
        assert!("Text".parse::<ClipboardType>().is_err());
        assert_eq!(ClipboardType::default(), ClipboardType::Text);
    }

    #[test]
    fn test_micros_round_trip() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(from_micros(to_micros(instant)).unwrap(), instant);
    }

    #[test]
    fn test_item_row_conversion() {
        let item_id = ItemId::new();
        let user_id = UserId::new();
        let row = ClipboardItemRow {
            id: item_id.to_string(),
            user_id: user_id.to_string(),
            client_id: Some("phone".to_string()),
            content: "hello".to_string(),
            item_type: "image".to_string(),
            timestamp: 1_704_110_400_000_000,
            created_at: 1_704_110_400_000_000,
            updated_at: 1_704_110_400_000_000,
        };

        let item = ClipboardItem::try_from(row).unwrap();
        assert_eq!(item.id, item_id);
        assert_eq!(item.user_id, user_id);
        assert_eq!(item.item_type, ClipboardType::Image);
        assert_eq!(item.timestamp.timestamp(), 1_704_110_400);
    }

    #[test]
    fn test_undecodable_item_row_is_corrupt() {
        let row = ClipboardItemRow {
            id: ItemId::new().to_string(),
            user_id: UserId::new().to_string(),
            client_id: None,
            content: String::new(),
            item_type: "video".to_string(),
            timestamp: 0,
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches!(
            ClipboardItem::try_from(row.clone()),
            Err(LibraryError::CorruptRow { ref field, .. }) if field == "clipboard_items.item_type"
        ));

        let bad_id = ClipboardItemRow {
            id: "not-a-uuid".to_string(),
            item_type: "text".to_string(),
            ..row
        };
        assert!(matches!(
            ClipboardItem::try_from(bad_id),
            Err(LibraryError::CorruptRow { ref field, .. }) if field == "clipboard_items.id"
        ));
    }

    #[test]
    fn test_item_serializes_type_field() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let item = ClipboardItem {
            id: ItemId::new(),
            user_id: UserId::new(),
            client_id: None,
            content: "x".to_string(),
            item_type: ClipboardType::File,
            timestamp: now,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "file");
        assert!(json.get("client_id").is_none());
    }

    #[test]
    fn test_user_debug_hides_secrets() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            salt: "abcdef".to_string(),
            token: Some("eyJ".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let rendered = format!("{:?}", user);
        assert!(!rendered.contains("argon2id"));
        assert!(!rendered.contains("abcdef"));
        assert!(!rendered.contains("eyJ"));
        assert!(!user.is_legacy());
    }
}
