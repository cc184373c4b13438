use std::sync::Arc;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::notify::TaskEvents;
use crate::storage::ObjectStore;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway. Postgres in production, in-memory under test.
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub objects: Arc<dyn ObjectStore>,
    /// Feeds the notification worker. Sending never blocks a request.
    pub events: TaskEvents,
    pub config: Config,
}
