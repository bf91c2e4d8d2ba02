//! Task repository for database operations.

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;
use tracing::instrument;

use super::models::Task;

/// Repository for task rows.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a task with the given title.
    #[instrument(skip(self))]
    pub async fn create(&self, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Task title cannot be empty.");
        }

        let id = sqlx::query_scalar::<_, i64>("INSERT INTO tasks (title) VALUES (?) RETURNING id")
            .bind(title)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert task")?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Task not found after creation"))
    }

    /// Get a task by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Task>> {
        sqlx::query_as::<_, Task>("SELECT id, title, created_at FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch task")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_task_create_and_get() {
        let db = Database::in_memory().await.unwrap();
        let repo = TaskRepository::new(db.pool().clone());

        let task = repo.create("Fix bug").await.unwrap();
        assert_eq!(task.title, "Fix bug");

        let fetched = repo.get(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, task.id);
        assert!(repo.get(task.id + 1).await.unwrap().is_none());
        assert!(repo.create(" ").await.is_err());
    }
}
