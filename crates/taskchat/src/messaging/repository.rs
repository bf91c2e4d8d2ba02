//! Repository for thread and message database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{MessageRow, NewMessage, Thread, ThreadSummaryRow};

/// Repository for threads, participants, and messages.
#[derive(Debug, Clone)]
pub struct MessagingRepository {
    pool: SqlitePool,
}

impl MessagingRepository {
    /// Create a new repository instance.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========== Thread Operations ==========

    /// Create a thread for a task and enroll its participants.
    ///
    /// Callers are expected to have validated the task and users; foreign
    /// keys reject anything that slipped through.
    #[instrument(skip(self))]
    pub async fn create_thread(&self, task_id: i64, participants: &[i64], now: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let thread_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO threads (task_id, created_at, last_message_at)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(task_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("inserting thread")?;

        for user_id in participants {
            sqlx::query(
                r#"
                INSERT INTO thread_participants (thread_id, user_id, joined_at)
                VALUES (?, ?, ?)
                ON CONFLICT(thread_id, user_id) DO NOTHING
                "#,
            )
            .bind(thread_id)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("inserting thread participant")?;
        }

        tx.commit().await?;

        debug!(thread_id, "Created thread");
        Ok(thread_id)
    }

    /// Get a thread by ID.
    pub async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>> {
        sqlx::query_as::<_, Thread>(
            "SELECT id, task_id, created_at, last_message_at FROM threads WHERE id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching thread")
    }

    /// Check whether a thread exists.
    pub async fn thread_exists(&self, thread_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .context("checking thread existence")?;
        Ok(count > 0)
    }

    /// Check whether a user is a member of a thread.
    pub async fn is_participant(&self, thread_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM thread_participants WHERE thread_id = ? AND user_id = ?",
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("checking thread membership")?;
        Ok(count > 0)
    }

    /// List participant ids of a thread in join order.
    pub async fn list_participants(&self, thread_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT user_id FROM thread_participants
            WHERE thread_id = ?
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .context("listing thread participants")
    }

    /// List every thread the user participates in, newest activity first.
    ///
    /// Partner, last message, and unread count are resolved per thread in
    /// the same statement.
    #[instrument(skip(self))]
    pub(crate) async fn list_thread_summaries(&self, user_id: i64) -> Result<Vec<ThreadSummaryRow>> {
        sqlx::query_as::<_, ThreadSummaryRow>(
            r#"
            SELECT
                t.id,
                t.task_id,
                task.title AS task_title,
                t.last_message_at,
                (
                    SELECT u.id FROM thread_participants p
                    JOIN users u ON u.id = p.user_id
                    WHERE p.thread_id = t.id AND p.user_id != ?
                    ORDER BY p.joined_at ASC, p.user_id ASC
                    LIMIT 1
                ) AS partner_id,
                (
                    SELECT u.display_name FROM thread_participants p
                    JOIN users u ON u.id = p.user_id
                    WHERE p.thread_id = t.id AND p.user_id != ?
                    ORDER BY p.joined_at ASC, p.user_id ASC
                    LIMIT 1
                ) AS partner_name,
                (
                    SELECT m.body FROM messages m
                    WHERE m.thread_id = t.id
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT 1
                ) AS last_message,
                (
                    SELECT COUNT(*) FROM messages m
                    WHERE m.thread_id = t.id
                      AND m.sender_id != ?
                      AND m.id > COALESCE(tp.last_read_message_id, 0)
                ) AS unread_count
            FROM threads t
            JOIN thread_participants tp ON tp.thread_id = t.id
            JOIN tasks task ON task.id = t.task_id
            WHERE tp.user_id = ?
            ORDER BY t.last_message_at DESC, t.id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("listing threads")
    }

    // ========== Message Operations ==========

    /// List messages of a thread in chronological order.
    #[instrument(skip(self))]
    pub(crate) async fn list_messages(&self, thread_id: i64) -> Result<Vec<MessageRow>> {
        sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.thread_id, m.sender_id, m.body, m.attachments, m.created_at,
                   u.display_name AS sender_name
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.thread_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .context("listing thread messages")
    }

    /// Store a message and bump the thread's activity in one transaction.
    ///
    /// The stored timestamp is never earlier than the thread's newest
    /// message, so timestamp order and id order agree even when a post's
    /// clock reading loses the race for the write lock. The thread timestamp
    /// only moves forward, and the sender's read marker moves to the new
    /// message.
    #[instrument(skip(self, message), fields(thread_id = message.thread_id, sender_id = message.sender_id))]
    pub async fn insert_message(&self, message: &NewMessage, now: i64) -> Result<i64> {
        let attachments = if message.attachments.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.attachments).context("encoding attachments")?)
        };

        let mut tx = self.pool.begin().await?;

        let (message_id, created_at) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            INSERT INTO messages (thread_id, sender_id, body, attachments, created_at)
            VALUES (?, ?, ?, ?, MAX(?, COALESCE(
                (SELECT MAX(created_at) FROM messages WHERE thread_id = ?), 0
            )))
            RETURNING id, created_at
            "#,
        )
        .bind(message.thread_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(&attachments)
        .bind(now)
        .bind(message.thread_id)
        .fetch_one(&mut *tx)
        .await
        .context("inserting message")?;

        sqlx::query("UPDATE threads SET last_message_at = MAX(last_message_at, ?) WHERE id = ?")
            .bind(created_at)
            .bind(message.thread_id)
            .execute(&mut *tx)
            .await
            .context("updating thread activity")?;

        sqlx::query(
            r#"
            UPDATE thread_participants
            SET last_read_message_id = MAX(COALESCE(last_read_message_id, 0), ?)
            WHERE thread_id = ? AND user_id = ?
            "#,
        )
        .bind(message_id)
        .bind(message.thread_id)
        .bind(message.sender_id)
        .execute(&mut *tx)
        .await
        .context("advancing sender read marker")?;

        tx.commit().await.context("committing message")?;

        Ok(message_id)
    }

    /// Id of the newest message in a thread.
    pub async fn latest_message_id(&self, thread_id: i64) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(id) FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .context("fetching latest message id")
    }

    /// Count messages in a thread.
    pub async fn count_messages(&self, thread_id: i64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .context("counting messages")
    }

    // ========== Read Tracking ==========

    /// Advance a participant's read marker to `up_to` (a message id); it
    /// never moves backwards.
    pub async fn mark_read(&self, thread_id: i64, user_id: i64, up_to: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE thread_participants
            SET last_read_message_id = MAX(COALESCE(last_read_message_id, 0), ?)
            WHERE thread_id = ? AND user_id = ?
            "#,
        )
        .bind(up_to)
        .bind(thread_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("updating read marker")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::task::TaskRepository;
    use crate::user::{CreateUserRequest, UserRepository};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        db: Database,
        repo: MessagingRepository,
        alice: i64,
        bob: i64,
        task: i64,
    }

    async fn setup() -> Fixture {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("test.db")).await.unwrap();

        let users = UserRepository::new(db.pool().clone());
        let alice = users
            .create(CreateUserRequest {
                display_name: "Alice".to_string(),
                email: None,
            })
            .await
            .unwrap()
            .id;
        let bob = users
            .create(CreateUserRequest {
                display_name: "Bob".to_string(),
                email: None,
            })
            .await
            .unwrap()
            .id;
        let task = TaskRepository::new(db.pool().clone())
            .create("Fix bug")
            .await
            .unwrap()
            .id;

        let repo = MessagingRepository::new(db.pool().clone());
        Fixture {
            _temp: temp,
            db,
            repo,
            alice,
            bob,
            task,
        }
    }

    fn message(thread_id: i64, sender_id: i64, body: &str) -> NewMessage {
        NewMessage {
            thread_id,
            sender_id,
            body: body.to_string(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_thread_and_membership() {
        let f = setup().await;
        let thread = f
            .repo
            .create_thread(f.task, &[f.alice, f.bob, f.alice], 1_000)
            .await
            .unwrap();

        assert!(f.repo.thread_exists(thread).await.unwrap());
        assert!(!f.repo.thread_exists(thread + 1).await.unwrap());
        assert!(f.repo.is_participant(thread, f.alice).await.unwrap());
        assert!(!f.repo.is_participant(thread, 999).await.unwrap());
        assert_eq!(
            f.repo.list_participants(thread).await.unwrap(),
            vec![f.alice, f.bob]
        );

        let stored = f.repo.get_thread(thread).await.unwrap().unwrap();
        assert_eq!(stored.task_id, f.task);
        assert_eq!(stored.last_message_at, 1_000);
    }

    #[tokio::test]
    async fn test_insert_message_bumps_thread_forward_only() {
        let f = setup().await;
        let thread = f.repo.create_thread(f.task, &[f.alice, f.bob], 1_000).await.unwrap();

        f.repo.insert_message(&message(thread, f.alice, "hi"), 5_000).await.unwrap();
        assert_eq!(f.repo.get_thread(thread).await.unwrap().unwrap().last_message_at, 5_000);

        // An older clock reading must not pull the thread back.
        f.repo.insert_message(&message(thread, f.bob, "hello"), 4_000).await.unwrap();
        assert_eq!(f.repo.get_thread(thread).await.unwrap().unwrap().last_message_at, 5_000);

        assert_eq!(f.repo.count_messages(thread).await.unwrap(), 2);
        let latest = f.repo.latest_message_id(thread).await.unwrap().unwrap();
        let newest = f.repo.list_messages(thread).await.unwrap().into_iter().map(|m| m.id).max();
        assert_eq!(Some(latest), newest);
    }

    #[tokio::test]
    async fn test_list_messages_in_posting_order_when_clock_steps_back() {
        let f = setup().await;
        let thread = f.repo.create_thread(f.task, &[f.alice, f.bob], 1_000).await.unwrap();

        f.repo.insert_message(&message(thread, f.alice, "first"), 3_000).await.unwrap();
        f.repo.insert_message(&message(thread, f.bob, "second"), 2_000).await.unwrap();
        f.repo.insert_message(&message(thread, f.alice, "third"), 3_500).await.unwrap();

        let rows = f.repo.list_messages(thread).await.unwrap();
        let bodies: Vec<&str> = rows.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);

        let created: Vec<i64> = rows.iter().map(|m| m.created_at).collect();
        assert_eq!(created, vec![3_000, 3_000, 3_500]);
        for pair in rows.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }

        let summary = f.repo.list_thread_summaries(f.bob).await.unwrap().remove(0);
        assert_eq!(summary.last_message.as_deref(), Some("third"));
    }

    #[tokio::test]
    async fn test_summaries_resolve_partner_and_unread() {
        let f = setup().await;
        let thread = f.repo.create_thread(f.task, &[f.alice, f.bob], 1_000).await.unwrap();

        let rows = f.repo.list_thread_summaries(f.alice).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].partner_id, Some(f.bob));
        assert_eq!(rows[0].partner_name.as_deref(), Some("Bob"));
        assert_eq!(rows[0].last_message, None);
        assert_eq!(rows[0].unread_count, 0);

        let first = f.repo.insert_message(&message(thread, f.bob, "one"), 2_000).await.unwrap();
        f.repo.insert_message(&message(thread, f.bob, "two"), 3_000).await.unwrap();

        let rows = f.repo.list_thread_summaries(f.alice).await.unwrap();
        assert_eq!(rows[0].last_message.as_deref(), Some("two"));
        assert_eq!(rows[0].unread_count, 2);

        f.repo.mark_read(thread, f.alice, first).await.unwrap();
        let rows = f.repo.list_thread_summaries(f.alice).await.unwrap();
        assert_eq!(rows[0].unread_count, 1);

        // Bob's own messages never count as unread for him.
        let rows = f.repo.list_thread_summaries(f.bob).await.unwrap();
        assert_eq!(rows[0].unread_count, 0);
        assert_eq!(rows[0].partner_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_mark_read_never_moves_backwards() {
        let f = setup().await;
        let thread = f.repo.create_thread(f.task, &[f.alice, f.bob], 1_000).await.unwrap();
        let id = f.repo.insert_message(&message(thread, f.bob, "one"), 2_000).await.unwrap();

        f.repo.mark_read(thread, f.alice, id).await.unwrap();
        f.repo.mark_read(thread, f.alice, 0).await.unwrap();

        let rows = f.repo.list_thread_summaries(f.alice).await.unwrap();
        assert_eq!(rows[0].unread_count, 0);
    }

    #[tokio::test]
    async fn test_failed_bump_rolls_back_message() {
        let f = setup().await;
        let thread = f.repo.create_thread(f.task, &[f.alice, f.bob], 1_000).await.unwrap();

        sqlx::raw_sql(
            r#"
            CREATE TRIGGER refuse_bump BEFORE UPDATE OF last_message_at ON threads
            BEGIN
                SELECT RAISE(ABORT, 'bump refused');
            END;
            "#,
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let result = f
            .repo
            .insert_message(&message(thread, f.alice, "lost"), 2_000)
            .await;
        assert!(result.is_err());

        assert_eq!(f.repo.count_messages(thread).await.unwrap(), 0);
        assert_eq!(f.repo.get_thread(thread).await.unwrap().unwrap().last_message_at, 1_000);
    }

    #[tokio::test]
    async fn test_create_thread_unknown_task_fails() {
        let f = setup().await;
        assert!(f.repo.create_thread(f.task + 50, &[f.alice], 1_000).await.is_err());
    }
}
