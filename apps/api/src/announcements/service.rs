use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::errors::AppError;
use crate::models::announcement::{Announcement, AnnouncementDraft};
use crate::state::AppState;
use crate::validation::require;

pub async fn list_announcements(state: &AppState) -> Result<Vec<Announcement>, AppError> {
    Ok(state.store.list_announcements().await?)
}

pub async fn create_announcement(
    state: &AppState,
    session: &Session,
    draft: AnnouncementDraft,
) -> Result<Announcement, AppError> {
    session.require_admin()?;
    require("title", &draft.title)?;
    let announcement = Announcement {
        id: Uuid::new_v4(),
        title: draft.title.trim().to_string(),
        content: draft.content,
        created_by: session.user.name.clone(),
        created_at: Utc::now(),
    };
    state.store.insert_announcement(&announcement).await?;
    info!("Announcement {} posted by {}", announcement.id, session.user.username);
    Ok(announcement)
}

pub async fn delete_announcement(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> Result<(), AppError> {
    session.require_admin()?;
    if !state.store.delete_announcement(id).await? {
        return Err(AppError::NotFound(format!("Announcement {id} not found")));
    }
    info!("Announcement {id} deleted by {}", session.user.username);
    Ok(())
}
