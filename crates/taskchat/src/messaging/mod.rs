//! Task-scoped message threads.
//!
//! A thread belongs to one task and has a fixed set of participants. The
//! module covers the three read/write paths the marketplace client uses:
//!
//! - thread listing with partner, last message, and unread count
//! - chronological message listing tagged for the requester
//! - posting, which stores the message and bumps the thread's activity in
//!   one transaction
//!
//! Every thread-scoped operation checks membership first. Unread counts
//! come from a per-participant read marker (the newest message id seen).

mod error;
mod models;
mod repository;
mod service;
mod time;

pub use error::MessagingError;
pub use models::{
    NewMessage, PostMessageRequest, PostMessageResponse, Thread, ThreadMessage, ThreadSummary,
    UNKNOWN_PARTNER_ID, UNKNOWN_PARTNER_NAME,
};
pub use repository::MessagingRepository;
pub use service::{DEFAULT_MAX_MESSAGE_LENGTH, MessagingService};
pub use time::{format_activity_time, format_time_of_day, now_millis};
