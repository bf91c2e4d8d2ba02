//! Task data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Task entity from database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub created_at: String,
}
