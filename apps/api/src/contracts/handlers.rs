use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::auth::Session;
use crate::contracts::service::{self, SignRequest, SignatureStatus};
use crate::errors::AppError;
use crate::models::contract::{Contract, ContractDraft};
use crate::models::user::User;
use crate::state::AppState;
use crate::uploads::read_file_field;

/// GET /api/v1/contract
pub async fn handle_get_contract(
    State(state): State<AppState>,
    _session: Session,
) -> Result<Json<Contract>, AppError> {
    Ok(Json(service::get_contract(&state).await?))
}

/// PUT /api/v1/contract
pub async fn handle_save_contract(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<ContractDraft>,
) -> Result<Json<Contract>, AppError> {
    Ok(Json(service::save_contract(&state, &session, draft).await?))
}

/// POST /api/v1/contract/sign
pub async fn handle_sign_contract(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SignRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service::sign_contract(&state, &session, req).await?))
}

/// POST /api/v1/contract/sign/pdf
pub async fn handle_upload_signed_pdf(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Json<User>, AppError> {
    let upload = read_file_field(multipart).await?;
    Ok(Json(
        service::upload_signed_pdf(&state, &session, upload).await?,
    ))
}

/// GET /api/v1/contract/signatures
pub async fn handle_list_signatures(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<SignatureStatus>>, AppError> {
    Ok(Json(service::list_signatures(&state, &session).await?))
}
