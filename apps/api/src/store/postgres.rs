use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::announcement::Announcement;
use crate::models::contract::{Contract, ContractDraft, MAIN_CONTRACT_ID};
use crate::models::task::{Task, TaskRow};
use crate::models::user::{Account, User, UserRow};
use crate::models::work_log::{WorkLog, WorkLogRow};
use crate::store::{DocumentStore, Scope, StoreError, StoreResult};

const USER_COLUMNS: &str = "id, username, email, name, role, avatar, department, employment_type, \
     signed_contract_at, contract_start_date, contract_pdf_url, signed_contract_version, created_at";

const WORK_LOG_COLUMNS: &str = "id, user_id, date, task, response, supervisor_reply, \
     supervisor_reply_at, completion_date, time_spent, problems, status, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, description, source, attachment, attachment_file, \
     assigned_to, responses, completion_date, status, revision, created_at, updated_at";

/// Postgres-backed gateway. One table per collection, see `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = String>,
{
    rows.into_iter()
        .map(|r| T::try_from(r).map_err(StoreError::Malformed))
        .collect()
}

fn convert_one<R, T>(row: Option<R>) -> StoreResult<Option<T>>
where
    T: TryFrom<R, Error = String>,
{
    row.map(|r| T::try_from(r).map_err(StoreError::Malformed))
        .transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505")
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn list_admins(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'admin' ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        convert_one(row)
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, name, role, avatar, department, employment_type,
                 signed_contract_at, contract_start_date, contract_pdf_url,
                 signed_contract_version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                avatar = EXCLUDED.avatar,
                department = EXCLUDED.department,
                employment_type = EXCLUDED.employment_type,
                signed_contract_at = EXCLUDED.signed_contract_at,
                contract_start_date = EXCLUDED.contract_start_date,
                contract_pdf_url = EXCLUDED.contract_pdf_url,
                signed_contract_version = EXCLUDED.signed_contract_version
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(&user.department)
        .bind(&user.employment_type)
        .bind(user.signed_contract_at)
        .bind(user.contract_start_date)
        .bind(&user.contract_pdf_url)
        .bind(user.signed_contract_version)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_account(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(sqlx::query_as::<_, Account>(
            "SELECT username, name, user_id, password_hash FROM accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_account_for_user(&self, user_id: Uuid) -> StoreResult<Option<Account>> {
        Ok(sqlx::query_as::<_, Account>(
            "SELECT username, name, user_id, password_hash FROM accounts WHERE user_id = $1 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO accounts (username, name, user_id, password_hash) VALUES ($1, $2, $3, $4)",
        )
        .bind(&account.username)
        .bind(&account.name)
        .bind(account.user_id)
        .bind(&account.password_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "login name '{}' is already registered",
                account.username
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_first_account(&self, account: &Account) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Self-conflicting mode: concurrent first-account inserts queue here.
        sqlx::query("LOCK TABLE accounts IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO accounts (username, name, user_id, password_hash) VALUES ($1, $2, $3, $4)",
        )
        .bind(&account.username)
        .bind(&account.name)
        .bind(account.user_id)
        .bind(&account.password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn update_account(&self, user_id: Uuid, username: &str, name: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET username = $1, name = $2 WHERE user_id = $3")
            .bind(username)
            .bind(name)
            .bind(user_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "login name '{username}' is already registered"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE accounts SET password_hash = $1 WHERE user_id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_accounts(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_work_logs(&self, scope: Scope) -> StoreResult<Vec<WorkLog>> {
        let rows: Vec<WorkLogRow> = match scope {
            Scope::All => {
                sqlx::query_as(&format!(
                    "SELECT {WORK_LOG_COLUMNS} FROM work_logs ORDER BY date DESC, created_at DESC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            Scope::Owner(user_id) => {
                sqlx::query_as(&format!(
                    "SELECT {WORK_LOG_COLUMNS} FROM work_logs WHERE user_id = $1 \
                     ORDER BY date DESC, created_at DESC, id ASC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        convert(rows)
    }

    async fn get_work_log(&self, id: Uuid) -> StoreResult<Option<WorkLog>> {
        let row: Option<WorkLogRow> = sqlx::query_as(&format!(
            "SELECT {WORK_LOG_COLUMNS} FROM work_logs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        convert_one(row)
    }

    async fn insert_work_log(&self, log: &WorkLog) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO work_logs
                (id, user_id, date, task, response, supervisor_reply, supervisor_reply_at,
                 completion_date, time_spent, problems, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.date)
        .bind(&log.task)
        .bind(&log.response)
        .bind(&log.supervisor_reply)
        .bind(log.supervisor_reply_at)
        .bind(log.completion_date)
        .bind(&log.time_spent)
        .bind(&log.problems)
        .bind(log.status.as_str())
        .bind(log.created_at)
        .bind(log.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_work_log(&self, log: &WorkLog) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE work_logs SET
                date = $2, task = $3, response = $4, supervisor_reply = $5,
                supervisor_reply_at = $6, completion_date = $7, time_spent = $8,
                problems = $9, status = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(log.id)
        .bind(log.date)
        .bind(&log.task)
        .bind(&log.response)
        .bind(&log.supervisor_reply)
        .bind(log.supervisor_reply_at)
        .bind(log.completion_date)
        .bind(&log.time_spent)
        .bind(&log.problems)
        .bind(log.status.as_str())
        .bind(log.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_work_log(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM work_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tasks(&self, scope: Scope) -> StoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> = match scope {
            Scope::All => {
                sqlx::query_as(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            Scope::Owner(user_id) => {
                sqlx::query_as(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE $1 = ANY(assigned_to) \
                     ORDER BY created_at DESC, id ASC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        convert(rows)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        convert_one(row)
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, title, description, source, attachment, attachment_file, assigned_to,
                 responses, completion_date, status, revision, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.source)
        .bind(&task.attachment)
        .bind(task.attachment_file.as_ref().map(Json))
        .bind(&task.assigned_to)
        .bind(Json(&task.responses))
        .bind(task.completion_date)
        .bind(task.status.as_str())
        .bind(task.revision)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_task(&self, task: &Task, expected_revision: i64) -> StoreResult<Task> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            r#"
            UPDATE tasks SET
                title = $3, description = $4, source = $5, attachment = $6,
                attachment_file = $7, assigned_to = $8, responses = $9,
                completion_date = $10, status = $11, updated_at = $12,
                revision = revision + 1
            WHERE id = $1 AND revision = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(expected_revision)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.source)
        .bind(&task.attachment)
        .bind(task.attachment_file.as_ref().map(Json))
        .bind(&task.assigned_to)
        .bind(Json(&task.responses))
        .bind(task.completion_date)
        .bind(task.status.as_str())
        .bind(task.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match convert_one(row)? {
            Some(saved) => Ok(saved),
            None => Err(StoreError::Conflict(format!(
                "task {} moved past revision {expected_revision}",
                task.id
            ))),
        }
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_contract(&self) -> StoreResult<Contract> {
        let row: Option<Contract> = sqlx::query_as(
            "SELECT id, title, content, version, updated_at FROM contracts WHERE id = $1",
        )
        .bind(MAIN_CONTRACT_ID)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(contract) = row {
            return Ok(contract);
        }

        // First read on a fresh database persists the default, so later reads
        // (and concurrent first reads) all see the same row.
        let initial = Contract::initial(Utc::now());
        sqlx::query(
            "INSERT INTO contracts (id, title, content, version, updated_at) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&initial.id)
        .bind(&initial.title)
        .bind(&initial.content)
        .bind(initial.version)
        .bind(initial.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(sqlx::query_as(
            "SELECT id, title, content, version, updated_at FROM contracts WHERE id = $1",
        )
        .bind(MAIN_CONTRACT_ID)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn save_contract(&self, draft: &ContractDraft, now: DateTime<Utc>) -> StoreResult<Contract> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Contract> = sqlx::query_as(
            "SELECT id, title, content, version, updated_at FROM contracts WHERE id = $1 FOR UPDATE",
        )
        .bind(MAIN_CONTRACT_ID)
        .fetch_optional(&mut *tx)
        .await?;
        let current = current.unwrap_or_else(|| Contract::initial(now));
        let next = current.next(draft, now);

        sqlx::query(
            r#"
            INSERT INTO contracts (id, title, content, version, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&next.id)
        .bind(&next.title)
        .bind(&next.content)
        .bind(next.version)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn list_announcements(&self) -> StoreResult<Vec<Announcement>> {
        Ok(sqlx::query_as::<_, Announcement>(
            "SELECT id, title, content, created_by, created_at FROM announcements \
             ORDER BY created_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_announcement(&self, announcement: &Announcement) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO announcements (id, title, content, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(&announcement.created_by)
        .bind(announcement.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_announcement(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
