use crate::common::env::FromEnv;
use crate::repositories::groups::BroadcastBackend;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub struct AppSettings {
    pub app_component: String,
    pub level: Level,
    pub app_host: IpAddr,
    pub app_port: u16,

    pub database_url: String,
    pub db_max_connections: usize,
    pub db_wait_timeout: Duration,
    pub db_run_migrations: bool,

    pub redis_url: String,
    pub redis_max_connections: usize,
    pub redis_connection_timeout: Duration,
    pub redis_response_timeout: Duration,
    pub redis_wait_timeout: Duration,

    pub broadcast_backend: BroadcastBackend,
    pub chat_master_key: String,
    pub session_timeout: Duration,

    pub media_root: PathBuf,
    pub media_url: String,

    pub admin_log_sources: Vec<(String, PathBuf)>,
}

impl AppSettings {
    pub fn load_from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv();

        let app_component = env::var("APP_COMPONENT")?;
        let level = Level::from_env("LOG_LEVEL")?;
        let app_host = IpAddr::from_env("APP_HOST")?;
        let app_port = u16::from_env("APP_PORT")?;

        let database_url = env::var("DATABASE_URL")?;
        let db_max_connections = usize::from_env("DB_MAX_CONNECTIONS")?;
        let db_wait_timeout_secs = u64::from_env("DB_WAIT_TIMEOUT_SECS")?;
        let db_wait_timeout = Duration::from_secs(db_wait_timeout_secs);
        let db_run_migrations = bool::from_env_or("DB_RUN_MIGRATIONS", false)?;

        let redis_url = env::var("REDIS_URL")?;
        let redis_max_connections = usize::from_env("REDIS_MAX_CONNECTIONS")?;
        let redis_connection_timeout_secs = u64::from_env("REDIS_CONNECTION_TIMEOUT_SECS")?;
        let redis_connection_timeout = Duration::from_secs(redis_connection_timeout_secs);
        let redis_response_timeout_secs = u64::from_env("REDIS_RESPONSE_TIMEOUT_SECS")?;
        let redis_response_timeout = Duration::from_secs(redis_response_timeout_secs);
        let redis_wait_timeout_secs = u64::from_env("REDIS_WAIT_TIMEOUT_SECS")?;
        let redis_wait_timeout = Duration::from_secs(redis_wait_timeout_secs);

        let broadcast_backend = BroadcastBackend::from_env("BROADCAST_BACKEND")?;
        let chat_master_key = env::var("CHAT_MASTER_KEY")?;
        let session_timeout_secs = u64::from_env_or("SESSION_TIMEOUT_SECS", 7 * 24 * 60 * 60)?;
        let session_timeout = Duration::from_secs(session_timeout_secs);

        let media_root = PathBuf::from(env::var("MEDIA_ROOT")?);
        let media_url = env::var("MEDIA_URL")?;

        let admin_log_sources = match env::var("ADMIN_LOG_SOURCES") {
            Ok(sources) => parse_log_sources(&sources)?,
            Err(_) => vec![],
        };

        Ok(AppSettings {
            app_component,
            level,
            app_port,
            app_host,

            database_url,
            db_max_connections,
            db_wait_timeout,
            db_run_migrations,

            redis_url,
            redis_max_connections,
            redis_connection_timeout,
            redis_response_timeout,
            redis_wait_timeout,

            broadcast_backend,
            chat_master_key,
            session_timeout,

            media_root,
            media_url,

            admin_log_sources,
        })
    }
}

/// Parses `name=path` pairs separated by commas.
pub fn parse_log_sources(input: &str) -> anyhow::Result<Vec<(String, PathBuf)>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
                Ok((name.trim().to_owned(), PathBuf::from(path.trim())))
            }
            _ => Err(anyhow::anyhow!("Invalid log source definition: {pair}")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_sources() {
        let sources = parse_log_sources("app=/var/log/app.log, worker = /var/log/worker.log,")
            .expect("valid sources");
        assert_eq!(
            sources,
            vec![
                ("app".to_owned(), PathBuf::from("/var/log/app.log")),
                ("worker".to_owned(), PathBuf::from("/var/log/worker.log")),
            ]
        );
    }

    #[test]
    fn rejects_log_source_without_path() {
        assert!(parse_log_sources("app=").is_err());
        assert!(parse_log_sources("/var/log/app.log").is_err());
    }
}
