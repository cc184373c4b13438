use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Session;
use crate::errors::AppError;
use crate::models::task::{Task, TaskDraft, TaskPatch};
use crate::models::Status;
use crate::state::AppState;
use crate::tasks::service::{self, ResponseRequest};
use crate::uploads::read_file_field;

#[derive(Deserialize)]
pub struct StatusChange {
    pub status: Status,
}

/// GET /api/v1/tasks
pub async fn handle_list_tasks(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Task>>, AppError> {
    Ok(Json(service::list_tasks(&state, &session).await?))
}

/// POST /api/v1/tasks
pub async fn handle_create_task(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = service::create_task(&state, &session, draft).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/v1/tasks/:id
pub async fn handle_update_task(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(service::update_task(&state, &session, id, patch).await?))
}

/// DELETE /api/v1/tasks/:id
pub async fn handle_delete_task(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_task(&state, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/tasks/:id/responses
pub async fn handle_add_response(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<ResponseRequest>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(service::add_response(&state, &session, id, req).await?))
}

/// PUT /api/v1/tasks/:id/status
pub async fn handle_set_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(service::set_status(&state, &session, id, req.status).await?))
}

/// POST /api/v1/tasks/:id/attachment
pub async fn handle_attach_file(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Task>, AppError> {
    let upload = read_file_field(multipart).await?;
    Ok(Json(service::attach_file(&state, &session, id, upload).await?))
}
