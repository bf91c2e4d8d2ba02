//! End-to-end messaging flows against a file-backed database.

use std::future::IntoFuture;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use futures::future::join_all;
use serde_json::{Value, json};
use taskchat::messaging::{PostMessageResponse, ThreadMessage, ThreadSummary};

mod common;
use common::file_test_context;

fn dev_user(user_id: i64) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-dev-user"),
        HeaderValue::from_str(&user_id.to_string()).unwrap(),
    )
}

#[tokio::test]
async fn test_concurrent_posts_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = file_test_context(dir.path()).await;
    let server = TestServer::new(ctx.app.clone()).unwrap();
    let path = format!("/api/threads/{}/messages", ctx.thread_id);

    let posts = (0..8).map(|i| {
        let sender = if i % 2 == 0 { ctx.alice } else { ctx.bob };
        let (name, value) = dev_user(sender);
        server
            .post(&path)
            .add_header(name, value)
            .json(&json!({ "body": format!("message {i}") }))
            .into_future()
    });

    for response in join_all(posts).await {
        response.assert_status_ok();
        let ack: PostMessageResponse = response.json();
        assert!(ack.success);
    }

    let (name, value) = dev_user(ctx.alice);
    let messages: Vec<ThreadMessage> = server.get(&path).add_header(name, value).await.json();
    assert_eq!(messages.len(), 8);
    for pair in messages.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }

    let thread = ctx
        .messaging()
        .repository()
        .get_thread(ctx.thread_id)
        .await
        .unwrap()
        .unwrap();
    let newest_post: i64 =
        sqlx::query_scalar("SELECT MAX(created_at) FROM messages WHERE thread_id = ?")
            .bind(ctx.thread_id)
            .fetch_one(ctx.db.pool())
            .await
            .unwrap();
    assert!(thread.last_message_at >= newest_post);
}

#[tokio::test]
async fn test_most_recent_thread_listed_first() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = file_test_context(dir.path()).await;
    let server = TestServer::new(ctx.app.clone()).unwrap();

    let second = ctx
        .messaging()
        .open_thread(ctx.task_id, &[ctx.alice, ctx.carol])
        .await
        .unwrap();

    let (name, value) = dev_user(ctx.alice);
    let threads: Vec<ThreadSummary> = server
        .get("/api/threads")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    let ids: Vec<i64> = threads.iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&ctx.thread_id) && ids.contains(&second));

    // A new message in the older thread moves it to the top.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    server
        .post(&format!("/api/threads/{}/messages", ctx.thread_id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "body": "bump" }))
        .await
        .assert_status_ok();

    let threads: Vec<ThreadSummary> = server
        .get("/api/threads")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(threads[0].id, ctx.thread_id);
    assert_eq!(threads[0].last_message, "bump");
    assert_eq!(threads[1].id, second);
    assert_eq!(threads[1].partner_name, "Carol");
    assert_eq!(threads[1].last_message, "");
    assert_eq!(threads[1].unread_count, 0);
}

#[tokio::test]
async fn test_reading_messages_clears_unread_for_reader_only() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = file_test_context(dir.path()).await;
    let server = TestServer::new(ctx.app.clone()).unwrap();
    let path = format!("/api/threads/{}/messages", ctx.thread_id);

    let (alice_name, alice_value) = dev_user(ctx.alice);
    let (bob_name, bob_value) = dev_user(ctx.bob);

    server
        .post(&path)
        .add_header(alice_name.clone(), alice_value.clone())
        .json(&json!({ "body": "ping", "attachments": ["https://files.example/brief.pdf"] }))
        .await
        .assert_status_ok();

    // The sender has nothing unread.
    let threads: Vec<ThreadSummary> = server
        .get("/api/threads")
        .add_header(alice_name, alice_value)
        .await
        .json();
    assert_eq!(threads[0].unread_count, 0);

    let threads: Vec<ThreadSummary> = server
        .get("/api/threads")
        .add_header(bob_name.clone(), bob_value.clone())
        .await
        .json();
    assert_eq!(threads[0].unread_count, 1);

    let messages: Value = server
        .get(&path)
        .add_header(bob_name.clone(), bob_value.clone())
        .await
        .json();
    assert_eq!(
        messages[0]["attachments"],
        json!(["https://files.example/brief.pdf"])
    );

    let threads: Vec<ThreadSummary> = server
        .get("/api/threads")
        .add_header(bob_name, bob_value)
        .await
        .json();
    assert_eq!(threads[0].unread_count, 0);
}

#[tokio::test]
async fn test_storage_failure_reports_generic_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = file_test_context(dir.path()).await;
    let server = TestServer::new(ctx.app.clone()).unwrap();

    sqlx::query(
        "CREATE TRIGGER refuse_bump BEFORE UPDATE OF last_message_at ON threads \
         BEGIN SELECT RAISE(ABORT, 'bump refused'); END",
    )
    .execute(ctx.db.pool())
    .await
    .unwrap();

    let (name, value) = dev_user(ctx.alice);
    let response = server
        .post(&format!("/api/threads/{}/messages", ctx.thread_id))
        .add_header(name, value)
        .json(&json!({ "body": "lost" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "Database error", "code": "INTERNAL_ERROR" }));

    assert_eq!(
        ctx.messaging()
            .repository()
            .count_messages(ctx.thread_id)
            .await
            .unwrap(),
        0
    );
}
