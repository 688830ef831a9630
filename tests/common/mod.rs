#![allow(dead_code)]

use chat_service::adapters::media::MediaStorage;
use chat_service::common::context::Context;
use chat_service::common::encryption::MessageCipher;
use chat_service::common::state::AppState;
use chat_service::consumers::admin_logs::LogSources;
use chat_service::consumers::{self, Consumer, Incoming, Outgoing};
use chat_service::common::error::ServiceResult;
use chat_service::entities::brands::Brand;
use chat_service::entities::sessions::{CreateSessionArgs, Session};
use chat_service::entities::users::User;
use chat_service::models::frames::OutboundFrame;
use chat_service::repositories::groups::LocalBroadcaster;
use chat_service::repositories::memory::MemoryChatStore;
use chat_service::repositories::sessions::MemorySessionStore;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryChatStore>,
    pub media_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_log_sources(vec![])
    }

    pub fn with_log_sources(sources: Vec<(String, PathBuf)>) -> Self {
        let store = Arc::new(MemoryChatStore::new());
        let media_dir = tempfile::tempdir().unwrap();
        let state = AppState {
            store: store.clone(),
            sessions: Arc::new(MemorySessionStore::new()),
            broadcaster: Arc::new(LocalBroadcaster::new()),
            cipher: Arc::new(MessageCipher::new("integration-test-master-key")),
            media: Arc::new(MediaStorage::new(media_dir.path(), "http://media.test/")),
            log_sources: Arc::new(LogSources::new(sources)),
            session_timeout: Duration::from_secs(3600),
        };
        Self {
            state,
            store,
            media_dir,
        }
    }

    pub fn add_user(&self, id: i64, username: &str) -> User {
        let user = User {
            id,
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
            is_staff: false,
            is_active: true,
            profile_image: None,
        };
        self.store.insert_user(user.clone());
        user
    }

    pub fn add_brand(&self, id: i64, owner_id: i64, organization_id: Option<i64>) -> Brand {
        let brand = Brand {
            id,
            name: format!("Brand {id}"),
            owner_id,
            organization_id,
            logo: None,
        };
        self.store.insert_brand(brand.clone());
        brand
    }

    pub async fn session(&self, user: &User) -> Session {
        self.state
            .sessions()
            .create(CreateSessionArgs {
                user_id: user.id,
                username: user.username.clone(),
                is_staff: user.is_staff,
            })
            .await
            .unwrap()
    }

    pub async fn staff_session(&self, user: &User) -> Session {
        self.state
            .sessions()
            .create(CreateSessionArgs {
                user_id: user.id,
                username: user.username.clone(),
                is_staff: true,
            })
            .await
            .unwrap()
    }
}

/// Client end of a consumer driven over in-memory channels.
pub struct TestSocket {
    incoming: mpsc::UnboundedSender<Incoming>,
    outgoing: mpsc::UnboundedReceiver<Outgoing>,
    task: JoinHandle<()>,
}

impl TestSocket {
    pub fn connect<C: Consumer + 'static>(state: &AppState, authorized: ServiceResult<C>) -> Self {
        let (incoming, incoming_rx) = mpsc::unbounded();
        let (outgoing_tx, outgoing) = mpsc::unbounded();
        let state = state.clone();
        let task = tokio::spawn(async move {
            consumers::run(&state, authorized, incoming_rx, outgoing_tx).await;
        });
        Self {
            incoming,
            outgoing,
            task,
        }
    }

    pub async fn send(&mut self, text: &str) {
        self.incoming
            .send(Incoming::Text(text.to_owned()))
            .await
            .unwrap();
    }

    pub async fn recv(&mut self) -> Outgoing {
        tokio::time::timeout(Duration::from_secs(5), self.outgoing.next())
            .await
            .expect("frame within timeout")
            .expect("socket still open")
    }

    pub async fn recv_frame(&mut self) -> OutboundFrame {
        match self.recv().await {
            Outgoing::Frame(frame) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    /// Asserts nothing arrives within a short grace period.
    pub async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(200), self.outgoing.next()).await;
        assert!(next.is_err(), "unexpected output: {next:?}");
    }

    pub async fn close(mut self) {
        let _ = self.incoming.send(Incoming::Closed).await;
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("consumer stops")
            .unwrap();
    }
}
