use crate::adapters::media::MediaStorage;
use crate::common::encryption::MessageCipher;
use crate::common::redis_pool::{RedisPool, RedisPoolManager};
use crate::common::state::AppState;
use crate::consumers::admin_logs::LogSources;
use crate::repositories::groups::{BroadcastBackend, Broadcaster, LocalBroadcaster, RedisBroadcaster};
use crate::repositories::mysql::MySqlChatStore;
use crate::repositories::sessions::RedisSessionStore;
use crate::settings::AppSettings;
use deadpool::Runtime;
use redis::{AsyncConnectionConfig, Commands};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::info;

pub fn initialize_logging(settings: &AppSettings) {
    tracing_subscriber::fmt()
        .with_max_level(settings.level)
        .with_timer(tracing_subscriber::fmt::time())
        .with_level(true)
        .compact()
        .init();
}

pub async fn initialize_state(settings: &AppSettings) -> anyhow::Result<AppState> {
    let db = initialize_db(settings).await?;
    if settings.db_run_migrations {
        sqlx::migrate!().run(&db).await?;
        info!("Database migrations applied");
    }
    let redis_client = redis::Client::open(settings.redis_url.as_str())?;
    let redis = initialize_redis(settings, redis_client.clone())?;
    let broadcaster: Arc<dyn Broadcaster> = match settings.broadcast_backend {
        BroadcastBackend::Local => Arc::new(LocalBroadcaster::new()),
        BroadcastBackend::Redis => {
            Arc::new(RedisBroadcaster::start(redis_client, redis.clone()).await?)
        }
    };
    info!(backend = ?settings.broadcast_backend, "Broadcaster ready");

    Ok(AppState {
        store: Arc::new(MySqlChatStore::new(db)),
        sessions: Arc::new(RedisSessionStore::new(redis)),
        broadcaster,
        cipher: Arc::new(MessageCipher::new(&settings.chat_master_key)),
        media: Arc::new(MediaStorage::new(&settings.media_root, &settings.media_url)),
        log_sources: Arc::new(LogSources::new(settings.admin_log_sources.clone())),
        session_timeout: settings.session_timeout,
    })
}

pub fn initialize_db(settings: &AppSettings) -> impl Future<Output = sqlx::Result<Pool<MySql>>> {
    MySqlPoolOptions::new()
        .acquire_timeout(settings.db_wait_timeout)
        .max_connections(settings.db_max_connections as _)
        .connect(&settings.database_url)
}

pub fn initialize_redis(settings: &AppSettings, redis_client: redis::Client) -> anyhow::Result<RedisPool> {
    let mut conn = redis_client.get_connection_with_timeout(settings.redis_wait_timeout)?;
    let _: () = conn.ping()?;
    let redis_cfg = AsyncConnectionConfig::new()
        .set_connection_timeout(settings.redis_connection_timeout)
        .set_response_timeout(settings.redis_response_timeout);

    let redis_manager = RedisPoolManager::new(redis_client, redis_cfg);
    let redis = RedisPool::builder(redis_manager)
        .max_size(settings.redis_max_connections)
        .wait_timeout(Some(settings.redis_wait_timeout))
        .runtime(Runtime::Tokio1)
        .build()?;
    Ok(redis)
}
