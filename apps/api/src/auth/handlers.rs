use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::auth::service::{self, LoginOutcome, NewAccount};
use crate::auth::Session;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, AppError> {
    let outcome = service::login(&state, &req.username, &req.password).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, AppError> {
    service::logout(&state, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/session
pub async fn handle_current_session(session: Session) -> Json<User> {
    Json(session.user)
}

/// POST /api/v1/setup
pub async fn handle_setup(
    State(state): State<AppState>,
    Json(req): Json<NewAccount>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = service::setup(&state, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
