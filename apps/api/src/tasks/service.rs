use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::errors::AppError;
use crate::models::task::{AttachmentFile, Task, TaskDraft, TaskPatch, TaskResponse};
use crate::models::Status;
use crate::notify::TaskEvent;
use crate::state::AppState;
use crate::store::StoreError;
use crate::uploads::{safe_file_name, Upload};
use crate::validation::require;

/// Conditional writes that lose to a concurrent writer are re-read and retried this many times.
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct ResponseRequest {
    pub content: String,
    pub completion_date: Option<NaiveDate>,
}

pub async fn list_tasks(state: &AppState, session: &Session) -> Result<Vec<Task>, AppError> {
    Ok(state.store.list_tasks(session.scope()).await?)
}

async fn check_assignees(state: &AppState, assignees: &[Uuid]) -> Result<(), AppError> {
    for id in assignees {
        if state.store.get_user(*id).await?.is_none() {
            return Err(AppError::Validation(format!("assignee {id} does not exist")));
        }
    }
    Ok(())
}

pub async fn create_task(state: &AppState, session: &Session, draft: TaskDraft) -> Result<Task, AppError> {
    session.require_admin()?;
    require("title", &draft.title)?;
    check_assignees(state, &draft.assigned_to).await?;

    let task = Task::from_draft(draft, Utc::now());
    state.store.insert_task(&task).await?;
    info!(
        "Task {} created by {} for {} assignee(s)",
        task.id,
        session.user.username,
        task.assigned_to.len()
    );
    state.events.emit(TaskEvent::Created(task.clone()));
    Ok(task)
}

/// Read, change, conditionally write. A write that loses to a concurrent
/// writer is retried against the fresh document instead of overwriting it.
async fn mutate_task<F>(state: &AppState, id: Uuid, mutate: F) -> Result<Task, AppError>
where
    F: Fn(&mut Task) -> Result<(), AppError>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let before = state
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {id} not found")))?;

        let mut next = before.clone();
        mutate(&mut next)?;

        match state.store.replace_task(&next, before.revision).await {
            Ok(saved) => {
                state.events.emit(TaskEvent::Updated {
                    before,
                    after: saved.clone(),
                });
                return Ok(saved);
            }
            Err(StoreError::Conflict(msg)) => {
                warn!("Task {id} write conflict (attempt {attempt}/{MAX_WRITE_ATTEMPTS}): {msg}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Conflict(format!(
        "Task {id} is being changed by someone else, please retry"
    )))
}

pub async fn update_task(
    state: &AppState,
    session: &Session,
    id: Uuid,
    patch: TaskPatch,
) -> Result<Task, AppError> {
    session.require_admin()?;
    if let Some(title) = &patch.title {
        require("title", title)?;
    }
    if let Some(assignees) = &patch.assigned_to {
        check_assignees(state, assignees).await?;
    }
    mutate_task(state, id, |task| {
        patch.apply(task, Utc::now());
        Ok(())
    })
    .await
}

/// Appends to the response thread; see `Task::append_response` for the status rule.
pub async fn add_response(
    state: &AppState,
    session: &Session,
    id: Uuid,
    req: ResponseRequest,
) -> Result<Task, AppError> {
    require("content", &req.content)?;
    let response = TaskResponse {
        id: Uuid::new_v4(),
        content: req.content.trim().to_string(),
        by: session.user_id(),
        by_name: session.user.name.clone(),
        created_at: Utc::now(),
    };

    let task = mutate_task(state, id, |task| {
        if !session.is_admin() && !task.is_assignee(session.user_id()) {
            return Err(AppError::Forbidden);
        }
        if let Some(date) = req.completion_date {
            task.completion_date = Some(date);
        }
        task.append_response(response.clone(), Utc::now());
        Ok(())
    })
    .await?;

    info!(
        "Response added to task {} by {} (status now {})",
        id, session.user.username, task.status
    );
    Ok(task)
}

pub async fn set_status(
    state: &AppState,
    session: &Session,
    id: Uuid,
    status: Status,
) -> Result<Task, AppError> {
    session.require_admin()?;
    mutate_task(state, id, |task| {
        task.set_status(status, Utc::now())
            .map_err(|e| AppError::Validation(e.to_string()))
    })
    .await
}

pub async fn delete_task(state: &AppState, session: &Session, id: Uuid) -> Result<(), AppError> {
    session.require_admin()?;
    if !state.store.delete_task(id).await? {
        return Err(AppError::NotFound(format!("Task {id} not found")));
    }
    info!("Task {id} deleted by {}", session.user.username);
    Ok(())
}

pub async fn attach_file(
    state: &AppState,
    session: &Session,
    id: Uuid,
    upload: Upload,
) -> Result<Task, AppError> {
    session.require_admin()?;
    if state.store.get_task(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Task {id} not found")));
    }

    let key = format!(
        "tasks/{id}/{}-{}",
        Utc::now().timestamp_millis(),
        safe_file_name(&upload.file_name)
    );
    let size = upload.bytes.len() as u64;
    let url = state
        .objects
        .put(&key, upload.bytes, &upload.content_type)
        .await?;

    let file = AttachmentFile {
        name: upload.file_name,
        size,
        content_type: upload.content_type,
        data: None,
        url: Some(url),
    };
    mutate_task(state, id, |task| {
        task.attachment_file = Some(file.clone());
        task.updated_at = Utc::now();
        Ok(())
    })
    .await
}
