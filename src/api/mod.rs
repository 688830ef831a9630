use crate::adapters::media::MediaStorage;
use crate::common::context::Context;
use crate::common::encryption::MessageCipher;
use crate::common::error::AppError;
use crate::common::init;
use crate::common::state::AppState;
use crate::entities::sessions::Session;
use crate::repositories::ChatStore;
use crate::repositories::groups::Broadcaster;
use crate::repositories::sessions::SessionStore;
use crate::settings::AppSettings;
use crate::usecases::sessions;
use axum::Router;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::get;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

pub mod v1;
pub mod ws;

/// An authenticated request: handlers taking it are rejected with 401
/// unless a valid session token was presented.
pub struct RequestContext {
    pub state: AppState,
    pub session: Session,
}

/// Session of the caller, if any. Socket routes accept unauthenticated
/// upgrades and reject them afterwards with a close code.
pub struct MaybeSession(pub Option<Session>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .nest("/api/v1", v1::router())
        .nest("/ws", ws::router())
}

pub async fn serve(settings: &AppSettings) -> anyhow::Result<()> {
    let state = init::initialize_state(settings).await?;
    let app = router().with_state(state);
    let addr = SocketAddr::new(settings.app_host, settings.app_port);
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn index() -> &'static str {
    "Running chat-service v0.1"
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Reads the token from `Authorization: Bearer <token>`, falling back to a
/// `token` query parameter for clients that cannot set headers.
fn session_token(parts: &Parts) -> Option<Uuid> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned());
    let token = match header {
        Some(token) => token,
        None => Query::<TokenQuery>::try_from_uri(&parts.uri).ok()?.0.token?,
    };
    Uuid::parse_str(&token).ok()
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id = session_token(parts).ok_or(AppError::Unauthorized)?;
        let session = sessions::authenticate(state, session_id).await?;
        Ok(Self {
            state: state.clone(),
            session,
        })
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session_id) = session_token(parts) else {
            return Ok(Self(None));
        };
        match sessions::authenticate(state, session_id).await {
            Ok(session) => Ok(Self(Some(session))),
            Err(AppError::SessionsNotFound) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}

impl Context for RequestContext {
    fn store(&self) -> &dyn ChatStore {
        self.state.store()
    }

    fn sessions(&self) -> &dyn SessionStore {
        self.state.sessions()
    }

    fn broadcaster(&self) -> &dyn Broadcaster {
        self.state.broadcaster()
    }

    fn cipher(&self) -> &MessageCipher {
        self.state.cipher()
    }

    fn media(&self) -> &MediaStorage {
        self.state.media()
    }

    fn session_timeout(&self) -> Duration {
        self.state.session_timeout()
    }
}
