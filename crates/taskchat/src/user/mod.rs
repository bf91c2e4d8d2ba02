//! User directory.
//!
//! Users are owned by the marketplace; this service only needs their ids and
//! display names to label participants and message senders.

mod models;
mod repository;

pub use models::{CreateUserRequest, User};
pub use repository::UserRepository;
