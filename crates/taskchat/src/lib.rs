//! Taskchat library
//!
//! Messaging backend for a task marketplace: task-scoped threads between
//! participants, served over an authenticated JSON API.

pub mod api;
pub mod auth;
pub mod db;
pub mod messaging;
pub mod task;
pub mod user;
