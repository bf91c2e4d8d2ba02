//! Messaging service: membership checks, validation, and read tracking on
//! top of the repository.

use tracing::{debug, info, instrument};

use super::error::MessagingError;
use super::models::{NewMessage, PostMessageRequest, ThreadMessage, ThreadSummary};
use super::repository::MessagingRepository;
use super::time::now_millis;
use crate::task::TaskRepository;
use crate::user::UserRepository;

/// Default limit on message body length, in characters.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 10_000;

type Result<T> = std::result::Result<T, MessagingError>;

/// Service for thread listing, message listing, and posting.
#[derive(Debug, Clone)]
pub struct MessagingService {
    repo: MessagingRepository,
    tasks: TaskRepository,
    users: UserRepository,
    max_message_length: usize,
}

impl MessagingService {
    /// Create a new messaging service.
    pub fn new(repo: MessagingRepository, tasks: TaskRepository, users: UserRepository) -> Self {
        Self {
            repo,
            tasks,
            users,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }

    /// Override the body length limit. Zero disables the check.
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    /// Access the underlying repository.
    pub fn repository(&self) -> &MessagingRepository {
        &self.repo
    }

    /// Every thread the requester participates in, most recent activity first.
    #[instrument(skip(self))]
    pub async fn list_threads(&self, requester_id: i64) -> Result<Vec<ThreadSummary>> {
        let rows = self.repo.list_thread_summaries(requester_id).await?;
        debug!(count = rows.len(), "Listed threads");
        Ok(rows.into_iter().map(|row| row.into_summary()).collect())
    }

    /// Messages of a thread in chronological order, tagged for the requester.
    ///
    /// Marks everything returned as read for the requester.
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        thread_id: i64,
        requester_id: i64,
    ) -> Result<Vec<ThreadMessage>> {
        self.ensure_participant(thread_id, requester_id).await?;

        let rows = self.repo.list_messages(thread_id).await?;
        if let Some(newest) = rows.iter().map(|row| row.id).max() {
            self.repo.mark_read(thread_id, requester_id, newest).await?;
        }

        Ok(rows
            .into_iter()
            .map(|row| row.into_message(requester_id))
            .collect())
    }

    /// Store a message from the requester and bump the thread's activity.
    ///
    /// Returns the new message id.
    #[instrument(skip(self, request))]
    pub async fn post_message(
        &self,
        thread_id: i64,
        requester_id: i64,
        request: PostMessageRequest,
    ) -> Result<i64> {
        let body = self.validate_body(request.body)?;
        self.ensure_participant(thread_id, requester_id).await?;

        let attachments = request
            .attachments
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let message = NewMessage {
            thread_id,
            sender_id: requester_id,
            body,
            attachments,
        };
        let message_id = self.repo.insert_message(&message, now_millis()).await?;

        info!(thread_id, message_id, "Message posted");
        Ok(message_id)
    }

    /// Mark every message currently in the thread as read for the requester.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, thread_id: i64, requester_id: i64) -> Result<()> {
        self.ensure_participant(thread_id, requester_id).await?;

        if let Some(latest) = self.repo.latest_message_id(thread_id).await? {
            self.repo.mark_read(thread_id, requester_id, latest).await?;
        }
        Ok(())
    }

    /// Open a thread for a task between the given users.
    #[instrument(skip(self))]
    pub async fn open_thread(&self, task_id: i64, participants: &[i64]) -> Result<i64> {
        let mut members: Vec<i64> = Vec::with_capacity(participants.len());
        for id in participants {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        if members.is_empty() {
            return Err(MessagingError::NoParticipants);
        }

        if self.tasks.get(task_id).await?.is_none() {
            return Err(MessagingError::TaskNotFound(task_id));
        }
        for id in &members {
            if !self.users.exists(*id).await? {
                return Err(MessagingError::UserNotFound(*id));
            }
        }

        let thread_id = self
            .repo
            .create_thread(task_id, &members, now_millis())
            .await?;
        info!(thread_id, task_id, participants = members.len(), "Opened thread");
        Ok(thread_id)
    }

    /// Reject unknown threads and non-members before any thread-scoped work.
    async fn ensure_participant(&self, thread_id: i64, user_id: i64) -> Result<()> {
        if !self.repo.thread_exists(thread_id).await? {
            return Err(MessagingError::ThreadNotFound(thread_id));
        }
        if !self.repo.is_participant(thread_id, user_id).await? {
            return Err(MessagingError::NotParticipant(thread_id));
        }
        Ok(())
    }

    fn validate_body(&self, body: Option<String>) -> Result<String> {
        let body = body.unwrap_or_default();
        if body.trim().is_empty() {
            return Err(MessagingError::EmptyBody);
        }
        if self.max_message_length > 0 && body.chars().count() > self.max_message_length {
            return Err(MessagingError::BodyTooLong {
                max: self.max_message_length,
            });
        }
        Ok(body)
    }
}
