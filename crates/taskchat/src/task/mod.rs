//! Task references.
//!
//! Task lifecycle lives elsewhere in the marketplace. Threads only borrow
//! the task title for display.

mod models;
mod repository;

pub use models::Task;
pub use repository::TaskRepository;
