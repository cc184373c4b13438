use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::session::{new_token, SessionError, SessionStore};

#[derive(Default)]
struct MemorySessions {
    sessions: HashMap<String, (Uuid, Instant)>,
    failures: HashMap<String, (u32, Instant)>,
}

/// In-process session store for tests.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemorySessions>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: Uuid, ttl_secs: u64) -> Result<String, SessionError> {
        let token = new_token();
        let expires = Instant::now() + Duration::from_secs(ttl_secs);
        self.inner
            .lock()
            .await
            .sessions
            .insert(token.clone(), (user_id, expires));
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, SessionError> {
        let mut inner = self.inner.lock().await;
        match inner.sessions.get(token) {
            Some((user_id, expires)) if *expires > Instant::now() => Ok(Some(*user_id)),
            Some(_) => {
                inner.sessions.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        self.inner.lock().await.sessions.remove(token);
        Ok(())
    }

    async fn failures(&self, identifier: &str) -> Result<u32, SessionError> {
        let inner = self.inner.lock().await;
        Ok(match inner.failures.get(identifier) {
            Some((count, expires)) if *expires > Instant::now() => *count,
            _ => 0,
        })
    }

    async fn record_failure(&self, identifier: &str, window_secs: u64) -> Result<u32, SessionError> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let entry = inner
            .failures
            .entry(identifier.to_string())
            .or_insert((0, now + Duration::from_secs(window_secs)));
        if entry.1 <= now {
            *entry = (0, now + Duration::from_secs(window_secs));
        }
        entry.0 += 1;
        Ok(entry.0)
    }

    async fn clear_failures(&self, identifier: &str) -> Result<(), SessionError> {
        self.inner.lock().await.failures.remove(identifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_session_roundtrip() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let token = store.create(user_id, 60).await.unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(store.resolve(&token).await.unwrap(), Some(user_id));

        store.revoke(&token).await.unwrap();
        assert_eq!(store.resolve(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_session_resolves_to_none() {
        let store = MemorySessionStore::new();
        let token = store.create(Uuid::new_v4(), 0).await.unwrap();
        assert_eq!(store.resolve(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failures_accumulate_and_clear() {
        let store = MemorySessionStore::new();
        assert_eq!(store.record_failure("wang", 60).await.unwrap(), 1);
        assert_eq!(store.record_failure("wang", 60).await.unwrap(), 2);
        assert_eq!(store.failures("wang").await.unwrap(), 2);
        assert_eq!(store.failures("li").await.unwrap(), 0);

        store.clear_failures("wang").await.unwrap();
        assert_eq!(store.failures("wang").await.unwrap(), 0);
    }
}
