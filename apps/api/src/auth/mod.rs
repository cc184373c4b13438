//! Authentication: login-name lookup, password verification, and bearer sessions.
//!
//! A request is either anonymous or carries a [`Session`] resolved from its
//! bearer token. There is no process-wide "current user".

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod password;
pub mod service;
pub mod session;

use axum::http::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

#[cfg(test)]
pub use memory::MemorySessionStore;
pub use session::{RedisSessionStore, Session, SessionError, SessionStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login name and password are required")]
    MissingCredentials,

    #[error("unknown login name")]
    UnknownIdentifier,

    #[error("wrong password")]
    WrongSecret,

    #[error("too many failed attempts")]
    RateLimited,

    #[error("session store error: {0}")]
    Session(#[from] SessionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            AuthError::Session(_) | AuthError::Store(_) | AuthError::Hashing(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::UnknownIdentifier | AuthError::WrongSecret => StatusCode::UNAUTHORIZED,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "MISSING_CREDENTIALS",
            AuthError::UnknownIdentifier => "UNKNOWN_USER",
            AuthError::WrongSecret => "WRONG_PASSWORD",
            AuthError::RateLimited => "RATE_LIMITED",
            _ => "AUTH_BACKEND_ERROR",
        }
    }

    /// Message shown to the person at the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Please enter your user name and password",
            AuthError::UnknownIdentifier => "This account does not exist",
            AuthError::WrongSecret => "Incorrect password",
            AuthError::RateLimited => "Too many failed attempts, please try again later",
            _ => "Login is temporarily unavailable, please try again",
        }
    }
}
