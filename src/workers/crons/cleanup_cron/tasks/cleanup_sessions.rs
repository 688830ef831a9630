use crate::common::context::Context;
use crate::common::error::ServiceResult;
use crate::usecases::sessions;

/// Removes every session idle for longer than the configured timeout.
pub async fn cleanup_sessions<C: Context>(ctx: &C) -> ServiceResult<usize> {
    sessions::delete_expired(ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::media::MediaStorage;
    use crate::common::encryption::MessageCipher;
    use crate::common::state::AppState;
    use crate::consumers::admin_logs::LogSources;
    use crate::entities::sessions::CreateSessionArgs;
    use crate::repositories::groups::LocalBroadcaster;
    use crate::repositories::memory::MemoryChatStore;
    use crate::repositories::sessions::MemorySessionStore;
    use chrono::{TimeDelta, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn removes_only_idle_sessions() {
        let ctx = AppState {
            store: Arc::new(MemoryChatStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            broadcaster: Arc::new(LocalBroadcaster::new()),
            cipher: Arc::new(MessageCipher::new("cleanup-test-key")),
            media: Arc::new(MediaStorage::new("/tmp", "http://localhost/media")),
            log_sources: Arc::new(LogSources::default()),
            session_timeout: Duration::from_secs(60),
        };
        let args = |user_id| CreateSessionArgs {
            user_id,
            username: format!("user{user_id}"),
            is_staff: false,
        };
        let fresh = ctx.sessions().create(args(1)).await.unwrap();
        let mut idle = ctx.sessions().create(args(2)).await.unwrap();
        idle.updated_at = Utc::now() - TimeDelta::minutes(5);
        ctx.sessions().update(idle.clone()).await.unwrap();

        assert_eq!(cleanup_sessions(&ctx).await, Ok(1));
        assert!(ctx.sessions().fetch_one(fresh.session_id).await.unwrap().is_some());
        assert!(ctx.sessions().fetch_one(idle.session_id).await.unwrap().is_none());
    }
}
