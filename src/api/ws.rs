//! WebSocket routes. Upgrades are always accepted; the consumer decides
//! afterwards whether the caller may stay, closing with a code otherwise.

use crate::api::MaybeSession;
use crate::common::error::ServiceResult;
use crate::common::state::AppState;
use crate::consumers::admin_logs::AdminLogsConsumer;
use crate::consumers::chat_room::ChatRoomConsumer;
use crate::consumers::conversation::ConversationConsumer;
use crate::consumers::notifications::NotificationsConsumer;
use crate::consumers::tweet_queue::TweetQueueConsumer;
use crate::consumers::{self, Consumer, Incoming, Outgoing};
use axum::Router;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use futures::future::ready;
use futures::{SinkExt, StreamExt};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversation/{conversation_id}/", get(conversation))
        .route("/chat/{room_id}/", get(chat_room))
        .route("/user/notifications/", get(notifications))
        .route(
            "/tweet-queue/{organization_pk}/{brand_pk}/",
            get(tweet_queue),
        )
        .route("/admin/logs/", get(admin_logs))
}

pub async fn conversation(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(conversation_id): Path<i64>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let authorized =
            ConversationConsumer::authorize(state.clone(), session, conversation_id).await;
        serve_socket(state, authorized, socket).await;
    })
}

pub async fn chat_room(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(room_id): Path<i64>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let authorized = ChatRoomConsumer::authorize(state.clone(), session, room_id).await;
        serve_socket(state, authorized, socket).await;
    })
}

pub async fn notifications(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let authorized = NotificationsConsumer::authorize(session);
        serve_socket(state, authorized, socket).await;
    })
}

pub async fn tweet_queue(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path((organization_id, brand_id)): Path<(i64, i64)>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let authorized =
            TweetQueueConsumer::authorize(&state, session, organization_id, brand_id).await;
        serve_socket(state, authorized, socket).await;
    })
}

pub async fn admin_logs(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let authorized = AdminLogsConsumer::authorize(session, state.log_sources.clone());
        serve_socket(state, authorized, socket).await;
    })
}

async fn serve_socket<C: Consumer>(state: AppState, authorized: ServiceResult<C>, socket: WebSocket) {
    let (sink, stream) = socket.split();
    let incoming = stream.filter_map(|message| ready(to_incoming(message)));
    let outgoing = sink.with(|out: Outgoing| ready(to_message(out)));
    consumers::run(&state, authorized, incoming, outgoing).await;
}

fn to_incoming(message: Result<Message, axum::Error>) -> Option<Incoming> {
    match message {
        Ok(Message::Text(text)) => Some(Incoming::Text(text.as_str().to_owned())),
        Ok(Message::Binary(_)) => Some(Incoming::Binary),
        // answered by axum
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Ok(Message::Close(_)) | Err(_) => Some(Incoming::Closed),
    }
}

fn to_message(out: Outgoing) -> Result<Message, axum::Error> {
    match out {
        Outgoing::Frame(frame) => {
            let text = serde_json::to_string(&frame).map_err(axum::Error::new)?;
            Ok(Message::Text(text.into()))
        }
        Outgoing::Close { code, reason } => Ok(Message::Close(Some(CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        }))),
    }
}
