use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Session;
use crate::errors::AppError;
use crate::models::work_log::{WorkLog, WorkLogDraft, WorkLogPatch, WorkLogReview};
use crate::state::AppState;
use crate::work_logs::service;

#[derive(Deserialize)]
pub struct WorkLogFilter {
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct TodayStatus {
    pub exists: bool,
    pub log: Option<WorkLog>,
}

/// GET /api/v1/work-logs
pub async fn handle_list_work_logs(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<WorkLogFilter>,
) -> Result<Json<Vec<WorkLog>>, AppError> {
    Ok(Json(
        service::list_work_logs(&state, &session, filter.user_id).await?,
    ))
}

/// GET /api/v1/work-logs/today
pub async fn handle_today(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<DateQuery>,
) -> Result<Json<TodayStatus>, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let log = service::log_for_date(&state, &session, date).await?;
    Ok(Json(TodayStatus {
        exists: log.is_some(),
        log,
    }))
}

/// POST /api/v1/work-logs
pub async fn handle_create_work_log(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<WorkLogDraft>,
) -> Result<(StatusCode, Json<WorkLog>), AppError> {
    let log = service::create_work_log(&state, &session, draft).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// PATCH /api/v1/work-logs/:id
pub async fn handle_update_work_log(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(patch): Json<WorkLogPatch>,
) -> Result<Json<WorkLog>, AppError> {
    Ok(Json(
        service::update_work_log(&state, &session, id, patch).await?,
    ))
}

/// PATCH /api/v1/work-logs/:id/review
pub async fn handle_review_work_log(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(review): Json<WorkLogReview>,
) -> Result<Json<WorkLog>, AppError> {
    Ok(Json(
        service::review_work_log(&state, &session, id, review).await?,
    ))
}

/// DELETE /api/v1/work-logs/:id
pub async fn handle_delete_work_log(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_work_log(&state, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/work-logs/export
pub async fn handle_export_work_logs(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<WorkLogFilter>,
) -> Result<impl IntoResponse, AppError> {
    let body = service::export_csv(&state, &session, filter.user_id).await?;
    let file_name = format!("work-logs-{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    ))
}
