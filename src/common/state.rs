use crate::adapters::media::MediaStorage;
use crate::common::context::Context;
use crate::common::encryption::MessageCipher;
use crate::consumers::admin_logs::LogSources;
use crate::repositories::groups::Broadcaster;
use crate::repositories::sessions::SessionStore;
use crate::repositories::ChatStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub cipher: Arc<MessageCipher>,
    pub media: Arc<MediaStorage>,
    pub log_sources: Arc<LogSources>,
    pub session_timeout: Duration,
}

impl Context for AppState {
    fn store(&self) -> &dyn ChatStore {
        self.store.as_ref()
    }

    fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    fn broadcaster(&self) -> &dyn Broadcaster {
        self.broadcaster.as_ref()
    }

    fn cipher(&self) -> &MessageCipher {
        &self.cipher
    }

    fn media(&self) -> &MediaStorage {
        &self.media
    }

    fn session_timeout(&self) -> Duration {
        self.session_timeout
    }
}
