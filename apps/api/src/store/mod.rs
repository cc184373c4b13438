//! Persistence gateway: typed access to the document collections.
//!
//! Every collection is reached only through [`DocumentStore`]. Ownership
//! filtering happens inside the store (see [`Scope`]) so callers never fetch
//! rows they are not allowed to see.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::announcement::Announcement;
use crate::models::contract::{Contract, ContractDraft};
use crate::models::task::Task;
use crate::models::user::{Account, User};
use crate::models::work_log::WorkLog;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored document is malformed: {0}")]
    Malformed(String),

    /// A conditional write lost against a concurrent writer, or a unique key already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which rows a list call may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Work logs owned by, or tasks assigned to, this user.
    Owner(Uuid),
}

impl Scope {
    pub fn admits_work_log(&self, log: &WorkLog) -> bool {
        match self {
            Scope::All => true,
            Scope::Owner(user_id) => log.user_id == *user_id,
        }
    }

    pub fn admits_task(&self, task: &Task) -> bool {
        match self {
            Scope::All => true,
            Scope::Owner(user_id) => task.is_assignee(*user_id),
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // users
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn list_admins(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Inserts or fully replaces a profile.
    async fn put_user(&self, user: &User) -> StoreResult<()>;

    // accounts
    async fn get_account(&self, username: &str) -> StoreResult<Option<Account>>;
    async fn get_account_for_user(&self, user_id: Uuid) -> StoreResult<Option<Account>>;
    /// Fails with `Conflict` when the login name is taken.
    async fn insert_account(&self, account: &Account) -> StoreResult<()>;
    /// Inserts `account` only while no account exists at all. Returns `false`
    /// and writes nothing otherwise. Check and insert are atomic.
    async fn insert_first_account(&self, account: &Account) -> StoreResult<bool>;
    async fn update_account(&self, user_id: Uuid, username: &str, name: &str) -> StoreResult<()>;
    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()>;
    async fn count_accounts(&self) -> StoreResult<i64>;

    // work logs
    async fn list_work_logs(&self, scope: Scope) -> StoreResult<Vec<WorkLog>>;
    async fn get_work_log(&self, id: Uuid) -> StoreResult<Option<WorkLog>>;
    async fn insert_work_log(&self, log: &WorkLog) -> StoreResult<()>;
    async fn update_work_log(&self, log: &WorkLog) -> StoreResult<()>;
    async fn delete_work_log(&self, id: Uuid) -> StoreResult<bool>;

    // tasks
    async fn list_tasks(&self, scope: Scope) -> StoreResult<Vec<Task>>;
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn insert_task(&self, task: &Task) -> StoreResult<()>;
    /// Conditional write: succeeds only while the stored revision equals
    /// `expected_revision`, and returns the task with its bumped revision.
    async fn replace_task(&self, task: &Task, expected_revision: i64) -> StoreResult<Task>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    // contract
    async fn get_contract(&self) -> StoreResult<Contract>;
    /// Writes the next version of the contract atomically.
    async fn save_contract(&self, draft: &ContractDraft, now: DateTime<Utc>) -> StoreResult<Contract>;

    // announcements
    async fn list_announcements(&self) -> StoreResult<Vec<Announcement>>;
    async fn insert_announcement(&self, announcement: &Announcement) -> StoreResult<()>;
    async fn delete_announcement(&self, id: Uuid) -> StoreResult<bool>;
}
