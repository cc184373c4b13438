use anyhow::{Context, Result};

/// SMTP relay settings. Absent when `SMTP_HOST` is unset.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    /// Link placed in notification mail.
    pub app_url: String,
    pub session_ttl_secs: u64,
    pub login_max_failures: u32,
    pub login_lockout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.is_empty() => Some(SmtpConfig {
                host,
                username: require_env("SMTP_USERNAME")?,
                password: require_env("SMTP_PASSWORD")?,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            smtp,
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Work Log System <noreply@localhost>".to_string()),
            app_url: std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 12 * 60 * 60)?,
            login_max_failures: parse_env("LOGIN_MAX_FAILURES", 5)?,
            login_lockout_secs: parse_env("LOGIN_LOCKOUT_SECS", 15 * 60)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
