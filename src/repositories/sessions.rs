use crate::common::redis_pool::RedisPool;
use crate::entities::sessions::{CreateSessionArgs, Session};
use async_trait::async_trait;
use chrono::Utc;
use hashbrown::HashMap;
use parking_lot::Mutex;
use redis::AsyncCommands;
use std::ops::DerefMut;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, args: CreateSessionArgs) -> anyhow::Result<Session>;
    async fn fetch_one(&self, session_id: Uuid) -> anyhow::Result<Option<Session>>;
    async fn fetch_all(&self) -> anyhow::Result<Vec<Session>>;
    async fn update(&self, session: Session) -> anyhow::Result<Session>;
    async fn delete(&self, session: &Session) -> anyhow::Result<()>;
}

fn new_session(args: CreateSessionArgs) -> Session {
    let now = Utc::now();
    Session {
        session_id: Uuid::new_v4(),
        user_id: args.user_id,
        username: args.username,
        is_staff: args.is_staff,
        created_at: now,
        updated_at: now,
    }
}

const SESSIONS_KEY: &str = "chat:sessions";

fn make_id_key(user_id: i64) -> String {
    format!("chat:sessions:user_ids:{user_id}")
}

pub struct RedisSessionStore {
    redis: RedisPool,
}

impl RedisSessionStore {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, args: CreateSessionArgs) -> anyhow::Result<Session> {
        let mut redis = self.redis.get().await?;
        let session = new_session(args);
        let user_id_key = make_id_key(session.user_id);
        redis::pipe()
            .atomic()
            .hset(SESSIONS_KEY, session.session_id, serde_json::to_string(&session)?)
            .ignore()
            .sadd(user_id_key, session.session_id)
            .ignore()
            .exec_async(redis.deref_mut())
            .await?;
        Ok(session)
    }

    async fn fetch_one(&self, session_id: Uuid) -> anyhow::Result<Option<Session>> {
        let mut redis = self.redis.get().await?;
        let session: Option<String> = redis.hget(SESSIONS_KEY, session_id).await?;
        match session {
            Some(session) => Ok(Some(serde_json::from_str(&session)?)),
            None => Ok(None),
        }
    }

    async fn fetch_all(&self) -> anyhow::Result<Vec<Session>> {
        let mut redis = self.redis.get().await?;
        let sessions: Vec<String> = redis.hvals(SESSIONS_KEY).await?;
        let sessions = sessions
            .iter()
            .map(|session| serde_json::from_str(session))
            .collect::<Result<_, _>>()?;
        Ok(sessions)
    }

    async fn update(&self, session: Session) -> anyhow::Result<Session> {
        let mut redis = self.redis.get().await?;
        let _: () = redis
            .hset(SESSIONS_KEY, session.session_id, serde_json::to_string(&session)?)
            .await?;
        Ok(session)
    }

    async fn delete(&self, session: &Session) -> anyhow::Result<()> {
        let mut redis = self.redis.get().await?;
        let user_id_key = make_id_key(session.user_id);
        redis::pipe()
            .atomic()
            .hdel(SESSIONS_KEY, session.session_id)
            .ignore()
            .srem(user_id_key, session.session_id)
            .ignore()
            .exec_async(redis.deref_mut())
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, args: CreateSessionArgs) -> anyhow::Result<Session> {
        let session = new_session(args);
        self.sessions
            .lock()
            .insert(session.session_id, session.clone());
        Ok(session)
    }

    async fn fetch_one(&self, session_id: Uuid) -> anyhow::Result<Option<Session>> {
        Ok(self.sessions.lock().get(&session_id).cloned())
    }

    async fn fetch_all(&self) -> anyhow::Result<Vec<Session>> {
        Ok(self.sessions.lock().values().cloned().collect())
    }

    async fn update(&self, session: Session) -> anyhow::Result<Session> {
        self.sessions
            .lock()
            .insert(session.session_id, session.clone());
        Ok(session)
    }

    async fn delete(&self, session: &Session) -> anyhow::Result<()> {
        self.sessions.lock().remove(&session.session_id);
        Ok(())
    }
}
