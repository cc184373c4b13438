use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::announcements::service;
use crate::auth::Session;
use crate::errors::AppError;
use crate::models::announcement::{Announcement, AnnouncementDraft};
use crate::state::AppState;

/// GET /api/v1/announcements
pub async fn handle_list_announcements(
    State(state): State<AppState>,
    _session: Session,
) -> Result<Json<Vec<Announcement>>, AppError> {
    Ok(Json(service::list_announcements(&state).await?))
}

/// POST /api/v1/announcements
pub async fn handle_create_announcement(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<AnnouncementDraft>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let announcement = service::create_announcement(&state, &session, draft).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

/// DELETE /api/v1/announcements/:id
pub async fn handle_delete_announcement(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_announcement(&state, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
