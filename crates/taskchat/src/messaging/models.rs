//! Thread and message data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;

use super::time::{format_activity_time, format_time_of_day};

/// Partner name shown when a thread has no other participant.
pub const UNKNOWN_PARTNER_NAME: &str = "Unknown";

/// Partner id shown when a thread has no other participant.
pub const UNKNOWN_PARTNER_ID: i64 = 0;

/// Thread row from database.
#[derive(Debug, Clone, FromRow)]
pub struct Thread {
    pub id: i64,
    pub task_id: i64,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds, bumped by every new message.
    pub last_message_at: i64,
}

/// Thread summary as listed for one requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: i64,
    pub task_id: i64,
    pub task_title: String,
    /// `YYYY-MM-DD HH:MM`, server-local.
    pub last_message_time: String,
    pub partner_name: String,
    pub partner_id: i64,
    /// Body of the newest message, empty when the thread has none.
    pub last_message: String,
    pub unread_count: i64,
}

/// Aggregated thread row, resolved against the requester.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ThreadSummaryRow {
    pub id: i64,
    pub task_id: i64,
    pub task_title: String,
    pub last_message_at: i64,
    pub partner_id: Option<i64>,
    pub partner_name: Option<String>,
    pub last_message: Option<String>,
    pub unread_count: i64,
}

impl ThreadSummaryRow {
    pub(crate) fn into_summary(self) -> ThreadSummary {
        let (partner_id, partner_name) = match (self.partner_id, self.partner_name) {
            (Some(id), Some(name)) => (id, name),
            _ => (UNKNOWN_PARTNER_ID, UNKNOWN_PARTNER_NAME.to_string()),
        };

        ThreadSummary {
            id: self.id,
            task_id: self.task_id,
            task_title: self.task_title,
            last_message_time: format_activity_time(self.last_message_at),
            partner_name,
            partner_id,
            last_message: self.last_message.unwrap_or_default(),
            unread_count: self.unread_count,
        }
    }
}

/// A message as seen by one requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    pub text: String,
    /// `HH:MM`, server-local.
    pub timestamp: String,
    pub sender_name: String,
    pub attachments: Vec<String>,
    pub is_me: bool,
}

/// Message row joined with its sender.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct MessageRow {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub attachments: Option<String>,
    pub created_at: i64,
    pub sender_name: String,
}

impl MessageRow {
    pub(crate) fn into_message(self, requester_id: i64) -> ThreadMessage {
        let attachments = decode_attachments(self.id, self.attachments.as_deref());

        ThreadMessage {
            id: self.id,
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            text: self.body,
            timestamp: format_time_of_day(self.created_at),
            sender_name: self.sender_name,
            attachments,
            is_me: self.sender_id == requester_id,
        }
    }
}

fn decode_attachments(message_id: i64, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!(message_id, error = %err, "Ignoring malformed attachments column");
        Vec::new()
    })
}

/// Message to be inserted.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub thread_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub attachments: Vec<String>,
}

/// Body of `POST /threads/{id}/messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMessageRequest {
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Acknowledgement for a stored message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub success: bool,
    pub message: String,
}

impl PostMessageResponse {
    pub fn sent() -> Self {
        Self {
            success: true,
            message: "Message sent".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_row() -> ThreadSummaryRow {
        ThreadSummaryRow {
            id: 7,
            task_id: 3,
            task_title: "Fix bug".to_string(),
            last_message_at: 1_700_000_000_000,
            partner_id: None,
            partner_name: None,
            last_message: None,
            unread_count: 0,
        }
    }

    #[test]
    fn test_summary_without_partner_uses_fallback() {
        let summary = summary_row().into_summary();
        assert_eq!(summary.partner_name, "Unknown");
        assert_eq!(summary.partner_id, 0);
        assert_eq!(summary.last_message, "");
        assert_eq!(summary.unread_count, 0);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ThreadSummaryRow {
            partner_id: Some(2),
            partner_name: Some("Bob".to_string()),
            last_message: Some("hello".to_string()),
            ..summary_row()
        }
        .into_summary();

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["taskId"], 3);
        assert_eq!(json["taskTitle"], "Fix bug");
        assert_eq!(json["partnerName"], "Bob");
        assert_eq!(json["partnerId"], 2);
        assert_eq!(json["lastMessage"], "hello");
        assert_eq!(json["unreadCount"], 0);
        assert!(json["lastMessageTime"].is_string());
    }

    #[test]
    fn test_message_is_me_and_attachments() {
        let row = MessageRow {
            id: 1,
            thread_id: 7,
            sender_id: 2,
            body: "hi".to_string(),
            attachments: Some(r#"["https://files.example/a.png"]"#.to_string()),
            created_at: 1_700_000_000_000,
            sender_name: "Bob".to_string(),
        };

        let mine = row.clone().into_message(2);
        assert!(mine.is_me);
        assert_eq!(mine.attachments, vec!["https://files.example/a.png"]);

        let theirs = row.into_message(1);
        assert!(!theirs.is_me);

        let json = serde_json::to_value(&theirs).unwrap();
        assert_eq!(json["isMe"], false);
        assert_eq!(json["senderName"], "Bob");
        assert_eq!(json["threadId"], 7);
    }

    #[test]
    fn test_malformed_attachments_decode_to_empty() {
        assert!(decode_attachments(1, Some("not json")).is_empty());
        assert!(decode_attachments(1, None).is_empty());
    }

    #[test]
    fn test_post_request_attachments_default() {
        let request: PostMessageRequest = serde_json::from_str(r#"{"body":"hi"}"#).unwrap();
        assert_eq!(request.body.as_deref(), Some("hi"));
        assert!(request.attachments.is_empty());

        let missing: PostMessageRequest = serde_json::from_str("{}").unwrap();
        assert!(missing.body.is_none());
    }
}
