//! User repository for database operations.

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{CreateUserRequest, User};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    #[instrument(skip(self, request), fields(display_name = %request.display_name))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            bail!("Display name cannot be empty.");
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (display_name, email)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(display_name)
        .bind(&request.email)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert user")?;

        debug!("Created user {} ({})", display_name, id);

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, display_name, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")
    }

    /// List all users, oldest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, display_name, email, created_at FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")
    }

    /// Check whether a user exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check user existence")?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_user_crud() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        let alice = repo
            .create(CreateUserRequest {
                display_name: "  Alice ".to_string(),
                email: Some("alice@example.com".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(alice.display_name, "Alice");

        let fetched = repo.get(alice.id).await.unwrap().unwrap();
        assert_eq!(fetched.email.as_deref(), Some("alice@example.com"));

        assert!(repo.exists(alice.id).await.unwrap());
        assert!(!repo.exists(alice.id + 100).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        let err = repo
            .create(CreateUserRequest {
                display_name: "   ".to_string(),
                email: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }
}
