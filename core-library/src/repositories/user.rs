//! User repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{now_micros, to_micros, NewUser, User, UserRow};
use async_trait::async_trait;
use core_auth::UserId;
use sqlx::{query_as, SqlitePool};

/// User repository interface for data access operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new active user.
    ///
    /// # Errors
    /// [`LibraryError::Conflict`] with `field` set to `username` or `email`
    /// when either is already taken.
    async fn insert(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find by username first, then by email.
    async fn find_by_login(&self, login: &str) -> Result<Option<User>>;

    /// Replace the stored salt and hash.
    async fn update_credentials(&self, id: &UserId, salt: &str, password_hash: &str)
        -> Result<()>;

    /// Record (or clear with `None`) the last issued session token.
    async fn set_token(&self, id: &UserId, token: Option<&str>) -> Result<()>;

    async fn set_active(&self, id: &UserId, active: bool) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, username, email, password_hash, salt, token, is_active, created_at, updated_at \
             FROM users WHERE {} = ?",
            column
        );
        let row = query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    fn ensure_touched(rows_affected: u64, id: &UserId) -> Result<()> {
        if rows_affected == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "User".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User> {
        let id = UserId::new();
        let now = to_micros(now_micros());

        let row = query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, email, password_hash, salt, token, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NULL, 1, ?, ?)
            RETURNING id, username, email, password_hash, salt, token, is_active, created_at, updated_at
            "#,
        )
        .bind(id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LibraryError::from_unique_violation(e, "users"))?;

        User::try_from(row)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        self.fetch_one_where("id", &id.to_string()).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_where("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_where("email", email).await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        match self.find_by_username(login).await? {
            Some(user) => Ok(Some(user)),
            None => self.find_by_email(login).await,
        }
    }

    async fn update_credentials(
        &self,
        id: &UserId,
        salt: &str,
        password_hash: &str,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET salt = ?, password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(salt)
                .bind(password_hash)
                .bind(to_micros(now_micros()))
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        Self::ensure_touched(result.rows_affected(), id)
    }

    async fn set_token(&self, id: &UserId, token: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE users SET token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(to_micros(now_micros()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Self::ensure_touched(result.rows_affected(), id)
    }

    async fn set_active(&self, id: &UserId, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(to_micros(now_micros()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Self::ensure_touched(result.rows_affected(), id)
    }

    async fn count(&self) -> Result<i64> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            salt: "salt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);

        let user = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();
        assert!(user.is_active);
        assert!(user.token.is_none());

        let by_id = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id, user);

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        let by_email = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(repo.find_by_username("bob").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_login_accepts_username_or_email() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let user = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        assert_eq!(repo.find_by_login("alice").await.unwrap().unwrap().id, user.id);
        assert_eq!(
            repo.find_by_login("alice@example.com").await.unwrap().unwrap().id,
            user.id
        );
        assert!(repo.find_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_conflict() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        match repo.insert(new_user("alice", "other@example.com")).await {
            Err(LibraryError::Conflict { field }) => assert_eq!(field, "username"),
            other => panic!("expected username conflict, got {:?}", other),
        }

        match repo.insert(new_user("alice2", "alice@example.com")).await {
            Err(LibraryError::Conflict { field }) => assert_eq!(field, "email"),
            other => panic!("expected email conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_credentials_and_token() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let user = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        repo.update_credentials(&user.id, "new-salt", "new-hash")
            .await
            .unwrap();
        repo.set_token(&user.id, Some("tok")).await.unwrap();

        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.salt, "new-salt");
        assert_eq!(stored.password_hash, "new-hash");
        assert_eq!(stored.token.as_deref(), Some("tok"));
        assert!(stored.updated_at >= user.updated_at);

        repo.set_token(&user.id, None).await.unwrap();
        let stored = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.token.is_none());
    }

    #[tokio::test]
    async fn test_set_active() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let user = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        repo.set_active(&user.id, false).await.unwrap();
        assert!(!repo.find_by_id(&user.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_updates_on_missing_user_are_not_found() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);

        let missing = UserId::new();
        assert!(matches!(
            repo.set_token(&missing, Some("t")).await,
            Err(LibraryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update_credentials(&missing, "s", "h").await,
            Err(LibraryError::NotFound { .. })
        ));
    }
}
