//! Shared fixtures for unit tests: an `AppState` wired to in-memory backends.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::auth::service::{create_account, NewAccount};
use crate::auth::{MemorySessionStore, Session};
use crate::config::Config;
use crate::models::user::{Role, User};
use crate::notify::{self, TaskEvent};
use crate::state::AppState;
use crate::storage::MemoryObjectStore;
use crate::store::MemoryStore;

pub const TEST_PASSWORD: &str = "secret-pass";

pub struct TestApp {
    pub state: AppState,
    pub events: UnboundedReceiver<TaskEvent>,
    pub objects: Arc<MemoryObjectStore>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        redis_url: "redis://unused".into(),
        s3_bucket: "test-bucket".into(),
        s3_endpoint: "http://localhost:9000".into(),
        aws_access_key_id: "test".into(),
        aws_secret_access_key: "test".into(),
        smtp: None,
        mail_from: "Work Log System <noreply@example.com>".into(),
        app_url: "https://worklog.example.com".into(),
        session_ttl_secs: 3600,
        login_max_failures: 5,
        login_lockout_secs: 900,
        port: 0,
        rust_log: "debug".into(),
    }
}

pub fn test_app() -> TestApp {
    let (events, rx) = notify::channel();
    let objects = Arc::new(MemoryObjectStore::new());
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        sessions: Arc::new(MemorySessionStore::new()),
        objects: objects.clone(),
        events,
        config: test_config(),
    };
    TestApp {
        state,
        events: rx,
        objects,
    }
}

pub fn new_account(username: &str, role: Role) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        password: TEST_PASSWORD.to_string(),
        name: format!("{username} name"),
        email: format!("{username}@example.com"),
        department: "Engineering".to_string(),
        employment_type: None,
        role,
    }
}

pub async fn seed_user(state: &AppState, username: &str, role: Role) -> User {
    create_account(state.store.as_ref(), new_account(username, role))
        .await
        .expect("seed account")
}

pub fn session_for(user: &User) -> Session {
    Session {
        token: format!("token-{}", user.id),
        user: user.clone(),
    }
}
