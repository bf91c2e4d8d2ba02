//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::db::Database;
use crate::messaging::{MessagingRepository, MessagingService};
use crate::task::TaskRepository;
use crate::user::UserRepository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread and message operations.
    pub messaging: Arc<MessagingService>,
    /// User directory, used to resolve login identities.
    pub users: Arc<UserRepository>,
    /// Authentication state.
    pub auth: AuthState,
}

impl AppState {
    /// Create new application state.
    pub fn new(messaging: MessagingService, users: UserRepository, auth: AuthState) -> Self {
        Self {
            messaging: Arc::new(messaging),
            users: Arc::new(users),
            auth,
        }
    }

    /// Wire every service onto one database.
    pub fn from_database(db: &Database, auth: AuthState, max_message_length: usize) -> Self {
        let pool = db.pool().clone();
        let users = UserRepository::new(pool.clone());
        let messaging = MessagingService::new(
            MessagingRepository::new(pool.clone()),
            TaskRepository::new(pool),
            users.clone(),
        )
        .with_max_message_length(max_message_length);

        Self::new(messaging, users, auth)
    }
}
