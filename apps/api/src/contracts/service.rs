use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::errors::AppError;
use crate::models::contract::{Contract, ContractDraft};
use crate::models::user::User;
use crate::state::AppState;
use crate::uploads::Upload;
use crate::validation::require;

#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
    pub employment_type: String,
    pub contract_start_date: NaiveDate,
}

/// One row of the admin signing overview.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignatureStatus {
    pub user_id: Uuid,
    pub name: String,
    pub department: String,
    pub employment_type: Option<String>,
    pub signed: bool,
    pub signed_contract_at: Option<chrono::DateTime<Utc>>,
    pub signed_contract_version: Option<i32>,
    /// Signed an older version than the one currently published.
    pub outdated: bool,
    pub contract_pdf_url: Option<String>,
}

pub async fn get_contract(state: &AppState) -> Result<Contract, AppError> {
    Ok(state.store.get_contract().await?)
}

pub async fn save_contract(
    state: &AppState,
    session: &Session,
    draft: ContractDraft,
) -> Result<Contract, AppError> {
    session.require_admin()?;
    require("title", &draft.title)?;
    require("content", &draft.content)?;
    let contract = state.store.save_contract(&draft, Utc::now()).await?;
    info!(
        "Contract saved as version {} by {}",
        contract.version, session.user.username
    );
    Ok(contract)
}

pub async fn sign_contract(
    state: &AppState,
    session: &Session,
    req: SignRequest,
) -> Result<User, AppError> {
    require("employment_type", &req.employment_type)?;
    let contract = state.store.get_contract().await?;

    let mut user = session.user.clone();
    user.signed_contract_at = Some(Utc::now());
    user.employment_type = Some(req.employment_type.trim().to_string());
    user.contract_start_date = Some(req.contract_start_date);
    user.signed_contract_version = Some(contract.version);
    state.store.put_user(&user).await?;

    info!(
        "User {} signed contract version {}",
        user.username, contract.version
    );
    Ok(user)
}

/// Rejects anything `pdf-extract` cannot open as a PDF.
async fn ensure_readable_pdf(upload: &Upload) -> Result<(), AppError> {
    let bytes = upload.bytes.clone();
    let rejected = match tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    })
    .await
    {
        Ok(Ok(_)) => return Ok(()),
        Ok(Err(message)) => message,
        // lopdf can panic on truncated input
        Err(e) if e.is_panic() => "parser panicked".to_string(),
        Err(e) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "spawn_blocking failed in PDF check: {e}"
            )))
        }
    };
    warn!("Rejected signed contract upload '{}': {rejected}", upload.file_name);
    Err(AppError::Validation(
        "Uploaded file is not a readable PDF".to_string(),
    ))
}

pub async fn upload_signed_pdf(
    state: &AppState,
    session: &Session,
    upload: Upload,
) -> Result<User, AppError> {
    let mut user = session.user.clone();
    if !user.has_signed_contract() {
        return Err(AppError::Validation(
            "Sign the contract before uploading the signed PDF".to_string(),
        ));
    }
    let version = match user.signed_contract_version {
        Some(version) => version,
        None => state.store.get_contract().await?.version,
    };
    ensure_readable_pdf(&upload).await?;

    let key = format!(
        "contracts/{}/v{}-{}.pdf",
        user.id,
        version,
        Utc::now().timestamp_millis()
    );
    let url = state
        .objects
        .put(&key, upload.bytes, "application/pdf")
        .await?;

    user.contract_pdf_url = Some(url);
    state.store.put_user(&user).await?;
    info!("Stored signed contract for {} at {key}", user.username);
    Ok(user)
}

pub async fn list_signatures(
    state: &AppState,
    session: &Session,
) -> Result<Vec<SignatureStatus>, AppError> {
    session.require_admin()?;
    let current = state.store.get_contract().await?.version;
    let users = state.store.list_users().await?;
    Ok(users
        .into_iter()
        .filter(|u| !u.is_admin())
        .map(|u| SignatureStatus {
            signed: u.has_signed_contract(),
            outdated: u.has_signed_contract()
                && u.signed_contract_version.map_or(true, |v| v < current),
            user_id: u.id,
            name: u.name,
            department: u.department,
            employment_type: u.employment_type,
            signed_contract_at: u.signed_contract_at,
            signed_contract_version: u.signed_contract_version,
            contract_pdf_url: u.contract_pdf_url,
        })
        .collect())
}
