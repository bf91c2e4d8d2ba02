//! Test utilities and common setup.
#![allow(dead_code)]

use std::path::Path;

use axum::Router;
use taskchat::api::{self, AppState};
use taskchat::auth::{AuthConfig, AuthState, DevUser};
use taskchat::db::Database;
use taskchat::messaging::{MessagingRepository, MessagingService};
use taskchat::task::TaskRepository;
use taskchat::user::{CreateUserRequest, UserRepository};

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";
pub const ALICE_PASSWORD: &str = "alicepassword123";

/// Seeded marketplace: three users, one task, and a thread between Alice
/// and Bob. Carol is registered but not a participant.
pub struct TestContext {
    pub app: Router,
    pub db: Database,
    pub auth: AuthState,
    pub alice: i64,
    pub bob: i64,
    pub carol: i64,
    pub task_id: i64,
    pub thread_id: i64,
}

impl TestContext {
    pub fn messaging(&self) -> MessagingService {
        let pool = self.db.pool().clone();
        MessagingService::new(
            MessagingRepository::new(pool.clone()),
            TaskRepository::new(pool.clone()),
            UserRepository::new(pool),
        )
    }

    /// Bearer token for a user, signed with the test secret.
    pub fn token_for(&self, user_id: i64, name: &str) -> String {
        self.auth.generate_token(user_id, None, name).unwrap()
    }
}

/// Create a test AuthConfig in dev mode with a JWT secret.
fn test_auth_config(dev_users: Vec<DevUser>) -> AuthConfig {
    let mut config = AuthConfig::default();
    config.dev_mode = true;
    config.jwt_secret = Some(TEST_SECRET.to_string());
    config.dev_users = dev_users;
    config
}

async fn seed(db: Database) -> TestContext {
    let users = UserRepository::new(db.pool().clone());
    let alice = create_user(&users, "Alice").await;
    let bob = create_user(&users, "Bob").await;
    let carol = create_user(&users, "Carol").await;

    let task = TaskRepository::new(db.pool().clone())
        .create("Fix bug")
        .await
        .unwrap();

    let auth = AuthState::new(test_auth_config(vec![DevUser {
        id: alice,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: bcrypt::hash(ALICE_PASSWORD, 4).unwrap(),
    }]));

    let state = AppState::from_database(&db, auth.clone(), 200);
    let thread_id = state
        .messaging
        .open_thread(task.id, &[alice, bob])
        .await
        .unwrap();

    TestContext {
        app: api::create_router(state),
        db,
        auth,
        alice,
        bob,
        carol,
        task_id: task.id,
        thread_id,
    }
}

async fn create_user(users: &UserRepository, name: &str) -> i64 {
    users
        .create(CreateUserRequest {
            display_name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
        })
        .await
        .unwrap()
        .id
}

/// Create a seeded application on an in-memory database.
pub async fn test_context() -> TestContext {
    let db = Database::in_memory().await.unwrap();
    seed(db).await
}

/// Create a seeded application on a file-backed database with a real pool.
pub async fn file_test_context(dir: &Path) -> TestContext {
    let db = Database::new(&dir.join("taskchat.db")).await.unwrap();
    seed(db).await
}
