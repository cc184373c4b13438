use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;
use crate::store::Scope;

const SESSION_PREFIX: &str = "session:";
const FAILURE_PREFIX: &str = "login_failures:";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("session record is malformed: {0}")]
    Malformed(String),
}

/// Bearer-token sessions plus the per-identifier failed-login counter.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user_id: Uuid, ttl_secs: u64) -> Result<String, SessionError>;
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, SessionError>;
    async fn revoke(&self, token: &str) -> Result<(), SessionError>;
    async fn failures(&self, identifier: &str) -> Result<u32, SessionError>;
    /// Returns the failure count after recording this one.
    async fn record_failure(&self, identifier: &str, window_secs: u64) -> Result<u32, SessionError>;
    async fn clear_failures(&self, identifier: &str) -> Result<(), SessionError>;
}

pub(crate) fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, SessionError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: Uuid, ttl_secs: u64) -> Result<String, SessionError> {
        let token = new_token();
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(format!("{SESSION_PREFIX}{token}"))
            .arg(user_id.to_string())
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, SessionError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(format!("{SESSION_PREFIX}{token}"))
            .query_async(&mut conn)
            .await?;
        value
            .map(|raw| Uuid::parse_str(&raw).map_err(|e| SessionError::Malformed(e.to_string())))
            .transpose()
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(format!("{SESSION_PREFIX}{token}"))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn failures(&self, identifier: &str) -> Result<u32, SessionError> {
        let mut conn = self.connection().await?;
        let count: Option<u32> = redis::cmd("GET")
            .arg(format!("{FAILURE_PREFIX}{identifier}"))
            .query_async(&mut conn)
            .await?;
        Ok(count.unwrap_or(0))
    }

    async fn record_failure(&self, identifier: &str, window_secs: u64) -> Result<u32, SessionError> {
        let key = format!("{FAILURE_PREFIX}{identifier}");
        let mut conn = self.connection().await?;
        let count: u32 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window_secs)
                .query_async::<_, ()>(&mut conn)
                .await?;
        }
        Ok(count)
    }

    async fn clear_failures(&self, identifier: &str) -> Result<(), SessionError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(format!("{FAILURE_PREFIX}{identifier}"))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Rows this caller may list.
    pub fn scope(&self) -> Scope {
        if self.is_admin() {
            Scope::All
        } else {
            Scope::Owner(self.user.id)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?.to_string();
        let user_id = state
            .sessions
            .resolve(&token)
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .ok_or(AppError::Unauthorized)?;
        // Profile is re-read on every request so role changes apply immediately.
        let user = state
            .store
            .get_user(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(Session { token, user })
    }
}
