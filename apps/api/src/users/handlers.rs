use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::service::{change_password, NewAccount};
use crate::auth::Session;
use crate::errors::AppError;
use crate::models::user::{AdminUserPatch, ProfilePatch, User};
use crate::state::AppState;
use crate::uploads::read_file_field;
use crate::users::service;

#[derive(Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// GET /api/v1/users/me
pub async fn handle_get_me(session: Session) -> Json<User> {
    Json(session.user)
}

/// PATCH /api/v1/users/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    session: Session,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service::update_profile(&state, &session, patch).await?))
}

/// PUT /api/v1/users/me/password
pub async fn handle_change_password(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<PasswordChange>,
) -> Result<StatusCode, AppError> {
    change_password(&state, &session, &req.current_password, &req.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/me/avatar
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Json<User>, AppError> {
    let upload = read_file_field(multipart).await?;
    Ok(Json(service::upload_avatar(&state, &session, upload).await?))
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(service::list_users(&state, &session).await?))
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    session: Session,
    Json(new): Json<NewAccount>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = service::create_employee(&state, &session, new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/v1/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(patch): Json<AdminUserPatch>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service::update_user(&state, &session, id, patch).await?))
}
