//! API request handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::{AUTH_COOKIE_NAME, CurrentUser};
use crate::messaging::{PostMessageRequest, PostMessageResponse, ThreadMessage, ThreadSummary};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// User info in login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Dev mode login endpoint.
///
/// Accepts a configured dev user's id or email with their password and sets
/// the `auth_token` cookie.
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = request?;

    if !state.auth.is_dev_mode() {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let dev_user = state
        .auth
        .validate_dev_credentials(&request.username, &request.password)
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    if !state.users.exists(dev_user.id).await? {
        tracing::warn!(
            user_id = dev_user.id,
            "Dev user has no matching row in the user directory"
        );
    }

    let token = state.auth.generate_dev_token(dev_user)?;
    let user_info = UserInfo {
        id: dev_user.id,
        name: dev_user.name.clone(),
        email: dev_user.email.clone(),
    };

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        AUTH_COOKIE_NAME,
        token,
        state.auth.token_ttl_secs()
    );

    info!(user_id = user_info.id, "User logged in successfully");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            token,
            user: user_info,
        }),
    ))
}

/// List the requester's threads, most recent activity first.
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn list_threads(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<ThreadSummary>>> {
    let threads = state.messaging.list_threads(user.id()).await?;
    Ok(Json(threads))
}

/// List a thread's messages in chronological order.
#[instrument(skip(state, user, thread_id), fields(user_id = user.id()))]
pub async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    thread_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<ThreadMessage>>> {
    let Path(thread_id) = thread_id?;
    let messages = state.messaging.list_messages(thread_id, user.id()).await?;
    Ok(Json(messages))
}

/// Post a message to a thread.
#[instrument(skip(state, user, thread_id, request), fields(user_id = user.id()))]
pub async fn post_message(
    State(state): State<AppState>,
    user: CurrentUser,
    thread_id: Result<Path<i64>, PathRejection>,
    request: Result<Json<PostMessageRequest>, JsonRejection>,
) -> ApiResult<Json<PostMessageResponse>> {
    let Path(thread_id) = thread_id?;
    let Json(request) = request?;

    state
        .messaging
        .post_message(thread_id, user.id(), request)
        .await?;

    Ok(Json(PostMessageResponse::sent()))
}

/// Mark-read acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub success: bool,
}

/// Mark a thread read for the requester.
#[instrument(skip(state, user, thread_id), fields(user_id = user.id()))]
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    thread_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MarkReadResponse>> {
    let Path(thread_id) = thread_id?;
    state.messaging.mark_read(thread_id, user.id()).await?;
    Ok(Json(MarkReadResponse { success: true }))
}
