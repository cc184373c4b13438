mod announcements;
mod auth;
mod config;
mod contracts;
mod db;
mod errors;
mod models;
mod notify;
mod routes;
mod state;
mod storage;
mod store;
mod tasks;
mod uploads;
mod users;
mod validation;
mod work_logs;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::RedisSessionStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::notify::mailer::{LogMailer, Mailer, SmtpMailer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3ObjectStore;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Work Log API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL
    let pool = create_pool(&config.database_url)
        .await
        .context("failed to initialize PostgreSQL")?;
    let store = Arc::new(PgStore::new(pool));

    // Redis: sessions and login failure counters
    let redis = redis::Client::open(config.redis_url.clone()).context("invalid REDIS_URL")?;
    let sessions = Arc::new(RedisSessionStore::new(redis));
    info!("Redis client initialized");

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let objects = Arc::new(S3ObjectStore::new(
        s3,
        config.s3_bucket.clone(),
        &config.s3_endpoint,
    ));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            info!("SMTP relay: {}", smtp.host);
            Arc::new(SmtpMailer::new(smtp, &config.mail_from).context("invalid SMTP configuration")?)
        }
        None => {
            info!("SMTP not configured, notifications are logged only");
            Arc::new(LogMailer)
        }
    };

    let (events, rx) = notify::channel();
    notify::spawn_notifier(rx, store.clone(), mailer, config.app_url.clone());

    let state = AppState {
        store,
        sessions,
        objects,
        events,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "worklog-static",
    );

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets under the path, not as subdomains.
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
