pub mod conversations;
pub mod sessions;

use crate::common::state::AppState;
use axum::Router;
use axum::routing::{get, post};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::login).delete(sessions::logout))
        .route("/conversations", get(conversations::list))
        .route("/conversations/stats", get(conversations::stats))
        .route("/conversations/{conversation_id}", get(conversations::retrieve))
        .route(
            "/conversations/{conversation_id}/messages",
            get(conversations::list_messages).post(conversations::create_message),
        )
        .route(
            "/conversations/start/user/{user_id}",
            post(conversations::start_with_user),
        )
        .route(
            "/conversations/start/brand/{brand_id}",
            post(conversations::start_with_brand),
        )
        .route(
            "/conversations/start/email",
            post(conversations::start_with_email),
        )
}
