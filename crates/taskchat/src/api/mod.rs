//! HTTP API: routes, handlers, and error mapping.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, DATABASE_ERROR, ErrorResponse};
pub use handlers::{HealthResponse, LoginRequest, LoginResponse, MarkReadResponse, UserInfo};
pub use routes::create_router;
pub use state::AppState;
