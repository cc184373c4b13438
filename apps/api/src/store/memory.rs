use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::announcement::Announcement;
use crate::models::contract::{Contract, ContractDraft};
use crate::models::task::Task;
use crate::models::user::{Account, User};
use crate::models::work_log::WorkLog;
use crate::store::{DocumentStore, Scope, StoreError, StoreResult};

struct Collections {
    users: HashMap<Uuid, User>,
    accounts: HashMap<String, Account>,
    work_logs: HashMap<Uuid, WorkLog>,
    tasks: HashMap<Uuid, Task>,
    contract: Contract,
    announcements: HashMap<Uuid, Announcement>,
}

/// Process-local store for tests. Orders results the same way `PgStore` does,
/// and starts with the default contract already in place.
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections {
                users: HashMap::new(),
                accounts: HashMap::new(),
                work_logs: HashMap::new(),
                tasks: HashMap::new(),
                contract: Contract::initial(Utc::now()),
                announcements: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn list_admins(&self) -> StoreResult<Vec<User>> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(User::is_admin)
            .collect())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        self.inner.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_account(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(username).cloned())
    }

    async fn get_account_for_user(&self, user_id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self
            .inner
            .read()
            .await
            .accounts
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&account.username) {
            return Err(StoreError::Conflict(format!(
                "login name '{}' is already registered",
                account.username
            )));
        }
        inner
            .accounts
            .insert(account.username.clone(), account.clone());
        Ok(())
    }

    async fn insert_first_account(&self, account: &Account) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.is_empty() {
            return Ok(false);
        }
        inner
            .accounts
            .insert(account.username.clone(), account.clone());
        Ok(true)
    }

    async fn update_account(&self, user_id: Uuid, username: &str, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner
            .accounts
            .values()
            .find(|a| a.user_id == user_id)
            .cloned()
        else {
            return Ok(());
        };
        if current.username != username && inner.accounts.contains_key(username) {
            return Err(StoreError::Conflict(format!(
                "login name '{username}' is already registered"
            )));
        }
        inner.accounts.remove(&current.username);
        inner.accounts.insert(
            username.to_string(),
            Account {
                username: username.to_string(),
                name: name.to_string(),
                ..current
            },
        );
        Ok(())
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        for account in inner.accounts.values_mut() {
            if account.user_id == user_id {
                account.password_hash = password_hash.to_string();
            }
        }
        Ok(())
    }

    async fn count_accounts(&self) -> StoreResult<i64> {
        Ok(self.inner.read().await.accounts.len() as i64)
    }

    async fn list_work_logs(&self, scope: Scope) -> StoreResult<Vec<WorkLog>> {
        let inner = self.inner.read().await;
        let mut logs: Vec<WorkLog> = inner
            .work_logs
            .values()
            .filter(|log| scope.admits_work_log(log))
            .cloned()
            .collect();
        logs.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(logs)
    }

    async fn get_work_log(&self, id: Uuid) -> StoreResult<Option<WorkLog>> {
        Ok(self.inner.read().await.work_logs.get(&id).cloned())
    }

    async fn insert_work_log(&self, log: &WorkLog) -> StoreResult<()> {
        self.inner.write().await.work_logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn update_work_log(&self, log: &WorkLog) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.work_logs.get_mut(&log.id) {
            *existing = log.clone();
        }
        Ok(())
    }

    async fn delete_work_log(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.work_logs.remove(&id).is_some())
    }

    async fn list_tasks(&self, scope: Scope) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|task| scope.admits_task(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        self.inner.write().await.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn replace_task(&self, task: &Task, expected_revision: i64) -> StoreResult<Task> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| StoreError::Conflict(format!("task {} no longer exists", task.id)))?;
        if stored.revision != expected_revision {
            return Err(StoreError::Conflict(format!(
                "task {} is at revision {}, expected {}",
                task.id, stored.revision, expected_revision
            )));
        }
        let mut saved = task.clone();
        saved.revision = expected_revision + 1;
        *stored = saved.clone();
        Ok(saved)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.tasks.remove(&id).is_some())
    }

    async fn get_contract(&self) -> StoreResult<Contract> {
        Ok(self.inner.read().await.contract.clone())
    }

    async fn save_contract(&self, draft: &ContractDraft, now: DateTime<Utc>) -> StoreResult<Contract> {
        let mut inner = self.inner.write().await;
        let next = inner.contract.next(draft, now);
        inner.contract = next.clone();
        Ok(next)
    }

    async fn list_announcements(&self) -> StoreResult<Vec<Announcement>> {
        let inner = self.inner.read().await;
        let mut items: Vec<Announcement> = inner.announcements.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn insert_announcement(&self, announcement: &Announcement) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .announcements
            .insert(announcement.id, announcement.clone());
        Ok(())
    }

    async fn delete_announcement(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.announcements.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::task::TaskDraft;
    use crate::models::work_log::WorkLogDraft;
    use crate::models::Status;

    fn log_for(user_id: Uuid, day: u32) -> WorkLog {
        WorkLog::from_draft(
            user_id,
            WorkLogDraft {
                date: NaiveDate::from_ymd_opt(2026, 5, day).unwrap(),
                task: "Daily report".into(),
                response: String::new(),
                completion_date: None,
                time_spent: "8h".into(),
                problems: String::new(),
            },
            Utc::now(),
        )
    }

    fn task_for(assignees: Vec<Uuid>) -> Task {
        Task::from_draft(
            TaskDraft {
                title: "Client follow-up".into(),
                description: String::new(),
                source: "client".into(),
                attachment: None,
                attachment_file: None,
                assigned_to: assignees,
                completion_date: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_owner_scope_filters_work_logs() {
        let store = MemoryStore::new();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_work_log(&log_for(u1, 1)).await.unwrap();
        store.insert_work_log(&log_for(u2, 1)).await.unwrap();

        let mine = store.list_work_logs(Scope::Owner(u1)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, u1);
        assert_eq!(store.list_work_logs(Scope::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_same_day_logs_are_both_accepted() {
        let store = MemoryStore::new();
        let u1 = Uuid::new_v4();
        store.insert_work_log(&log_for(u1, 7)).await.unwrap();
        store.insert_work_log(&log_for(u1, 7)).await.unwrap();
        assert_eq!(store.list_work_logs(Scope::Owner(u1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_is_stable_without_writes() {
        let store = MemoryStore::new();
        let u1 = Uuid::new_v4();
        for day in 1..=5 {
            store.insert_work_log(&log_for(u1, day)).await.unwrap();
            store.insert_task(&task_for(vec![u1])).await.unwrap();
        }
        assert_eq!(
            store.list_work_logs(Scope::All).await.unwrap(),
            store.list_work_logs(Scope::All).await.unwrap()
        );
        assert_eq!(
            store.list_tasks(Scope::Owner(u1)).await.unwrap(),
            store.list_tasks(Scope::Owner(u1)).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_task_scope_matches_any_assignee() {
        let store = MemoryStore::new();
        let (u1, u2, u3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.insert_task(&task_for(vec![u1, u2])).await.unwrap();
        assert_eq!(store.list_tasks(Scope::Owner(u2)).await.unwrap().len(), 1);
        assert!(store.list_tasks(Scope::Owner(u3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_replace_is_rejected() {
        let store = MemoryStore::new();
        let u1 = Uuid::new_v4();
        let base = task_for(vec![u1]);
        store.insert_task(&base).await.unwrap();

        let mut first = base.clone();
        first.set_status(Status::Processing, Utc::now()).unwrap();
        let saved = store.replace_task(&first, base.revision).await.unwrap();
        assert_eq!(saved.revision, base.revision + 1);

        let err = store.replace_task(&base, base.revision).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_login_name_conflicts() {
        let store = MemoryStore::new();
        let account = Account {
            username: "wang".into(),
            name: "Wang".into(),
            user_id: Uuid::new_v4(),
            password_hash: "x".into(),
        };
        store.insert_account(&account).await.unwrap();
        assert!(matches!(
            store.insert_account(&account).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_contract_reads_are_repeatable() {
        let store = MemoryStore::new();
        let first = store.get_contract().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.get_contract().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.version, 1);
    }

    #[tokio::test]
    async fn test_contract_save_bumps_version() {
        let store = MemoryStore::new();
        let before = store.get_contract().await.unwrap();
        let draft = ContractDraft {
            title: before.title.clone(),
            content: "<p>v2</p>".into(),
        };
        let after = store.save_contract(&draft, before.updated_at).await.unwrap();
        assert_eq!(after.version, before.version + 1);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(store.get_contract().await.unwrap(), after);
    }
}
