use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::errors::AppError;
use crate::models::user::User;
use crate::models::work_log::{WorkLog, WorkLogDraft, WorkLogPatch, WorkLogReview};
use crate::state::AppState;
use crate::store::Scope;
use crate::validation::require;

/// Admins may narrow to one employee; everyone else only ever sees their own logs.
fn scope_for(session: &Session, user_filter: Option<Uuid>) -> Scope {
    match (session.scope(), user_filter) {
        (Scope::All, Some(user_id)) => Scope::Owner(user_id),
        (scope, _) => scope,
    }
}

pub async fn list_work_logs(
    state: &AppState,
    session: &Session,
    user_filter: Option<Uuid>,
) -> Result<Vec<WorkLog>, AppError> {
    Ok(state
        .store
        .list_work_logs(scope_for(session, user_filter))
        .await?)
}

/// The caller's log for `date`, if any. Clients use this to hide "new log" once one exists.
pub async fn log_for_date(
    state: &AppState,
    session: &Session,
    date: NaiveDate,
) -> Result<Option<WorkLog>, AppError> {
    let logs = state
        .store
        .list_work_logs(Scope::Owner(session.user_id()))
        .await?;
    Ok(logs.into_iter().find(|log| log.date == date))
}

/// Always accepted, even when the caller already has a log for that date.
pub async fn create_work_log(
    state: &AppState,
    session: &Session,
    draft: WorkLogDraft,
) -> Result<WorkLog, AppError> {
    require("task", &draft.task)?;
    let log = WorkLog::from_draft(session.user_id(), draft, Utc::now());
    state.store.insert_work_log(&log).await?;
    info!("Work log {} for {} created by {}", log.id, log.date, session.user.username);
    Ok(log)
}

async fn load_for_write(state: &AppState, session: &Session, id: Uuid) -> Result<WorkLog, AppError> {
    let log = state
        .store
        .get_work_log(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Work log {id} not found")))?;
    if !session.is_admin() && log.user_id != session.user_id() {
        return Err(AppError::Forbidden);
    }
    Ok(log)
}

pub async fn update_work_log(
    state: &AppState,
    session: &Session,
    id: Uuid,
    patch: WorkLogPatch,
) -> Result<WorkLog, AppError> {
    if let Some(task) = &patch.task {
        require("task", task)?;
    }
    let mut log = load_for_write(state, session, id).await?;
    patch.apply(&mut log, Utc::now());
    state.store.update_work_log(&log).await?;
    Ok(log)
}

pub async fn review_work_log(
    state: &AppState,
    session: &Session,
    id: Uuid,
    review: WorkLogReview,
) -> Result<WorkLog, AppError> {
    session.require_admin()?;
    let mut log = load_for_write(state, session, id).await?;
    log.review(&review, Utc::now());
    state.store.update_work_log(&log).await?;
    info!("Work log {id} reviewed by {}", session.user.username);
    Ok(log)
}

pub async fn delete_work_log(state: &AppState, session: &Session, id: Uuid) -> Result<(), AppError> {
    load_for_write(state, session, id).await?;
    state.store.delete_work_log(id).await?;
    info!("Work log {id} deleted by {}", session.user.username);
    Ok(())
}

const EXPORT_HEADERS: [&str; 9] = [
    "Date",
    "Employee",
    "Department",
    "Task",
    "Response",
    "Completion date",
    "Time spent",
    "Problems",
    "Status",
];

/// CSV with a UTF-8 BOM so spreadsheet tools pick the right encoding.
pub async fn export_csv(
    state: &AppState,
    session: &Session,
    user_filter: Option<Uuid>,
) -> Result<String, AppError> {
    session.require_admin()?;
    let logs = list_work_logs(state, session, user_filter).await?;
    let users: HashMap<Uuid, User> = state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    render_csv(&logs, &users)
}

pub fn render_csv(logs: &[WorkLog], users: &HashMap<Uuid, User>) -> Result<String, AppError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(EXPORT_HEADERS)
        .map_err(|e| AppError::Internal(e.into()))?;

    for log in logs {
        let user = users.get(&log.user_id);
        let completion = log
            .completion_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        wtr.write_record([
            log.date.to_string().as_str(),
            user.map(|u| u.name.as_str()).unwrap_or(""),
            user.map(|u| u.department.as_str()).unwrap_or(""),
            log.task.as_str(),
            log.response.as_str(),
            completion.as_str(),
            log.time_spent.as_str(),
            log.problems.as_str(),
            log.status.label(),
        ])
        .map_err(|e| AppError::Internal(e.into()))?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("CSV flush failed: {e}")))?;
    let body = String::from_utf8(data).map_err(|e| AppError::Internal(e.into()))?;
    Ok(format!("\u{FEFF}{body}"))
}
