use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::service::{create_account, NewAccount};
use crate::auth::Session;
use crate::errors::AppError;
use crate::models::user::{AdminUserPatch, ProfilePatch, Role, User};
use crate::state::AppState;
use crate::uploads::Upload;
use crate::validation::{require, validate_email, validate_password, validate_username};

pub async fn update_profile(
    state: &AppState,
    session: &Session,
    patch: ProfilePatch,
) -> Result<User, AppError> {
    if let Some(name) = &patch.name {
        require("name", name)?;
    }
    if let Some(email) = &patch.email {
        validate_email(email)?;
    }

    let mut user = session.user.clone();
    patch.apply(&mut user);
    state.store.put_user(&user).await?;
    if user.name != session.user.name {
        state
            .store
            .update_account(user.id, &user.username, &user.name)
            .await?;
    }
    Ok(user)
}

pub async fn upload_avatar(
    state: &AppState,
    session: &Session,
    upload: Upload,
) -> Result<User, AppError> {
    if !upload.content_type.starts_with("image/") {
        return Err(AppError::Validation("Avatar must be an image".to_string()));
    }
    let key = format!(
        "avatars/{}_{}.jpg",
        session.user_id(),
        Utc::now().timestamp_millis()
    );
    let url = state
        .objects
        .put(&key, upload.bytes, &upload.content_type)
        .await?;

    let mut user = session.user.clone();
    user.avatar = url;
    state.store.put_user(&user).await?;
    info!("Avatar updated for {}", user.username);
    Ok(user)
}

pub async fn list_users(state: &AppState, session: &Session) -> Result<Vec<User>, AppError> {
    session.require_admin()?;
    Ok(state.store.list_users().await?)
}

/// Admin-created logins are always employees; promotion goes through `update_user`.
pub async fn create_employee(
    state: &AppState,
    session: &Session,
    new: NewAccount,
) -> Result<User, AppError> {
    session.require_admin()?;
    create_account(
        state.store.as_ref(),
        NewAccount {
            role: Role::Employee,
            ..new
        },
    )
    .await
}

pub async fn update_user(
    state: &AppState,
    session: &Session,
    id: Uuid,
    patch: AdminUserPatch,
) -> Result<User, AppError> {
    session.require_admin()?;
    if let Some(username) = &patch.username {
        validate_username(username)?;
    }
    if let Some(name) = &patch.name {
        require("name", name)?;
    }
    if let Some(email) = patch.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(password) = &patch.password {
        validate_password(password)?;
    }

    let mut user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    let before = user.clone();
    patch.apply(&mut user);

    // Login name first: a taken name must fail before the profile changes.
    if user.username != before.username || user.name != before.name {
        state
            .store
            .update_account(user.id, &user.username, &user.name)
            .await?;
    }
    state.store.put_user(&user).await?;
    if let Some(password) = &patch.password {
        let hash = hash_password(password).await?;
        state.store.set_password_hash(user.id, &hash).await?;
    }

    info!("User {} updated by {}", user.username, session.user.username);
    Ok(user)
}
