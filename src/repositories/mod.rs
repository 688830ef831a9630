pub mod brands;
pub mod chat_rooms;
pub mod conversations;
pub mod groups;
pub mod memory;
pub mod messages;
pub mod mysql;
pub mod sessions;
pub mod users;

use crate::entities::brands::Brand;
use crate::entities::chat_rooms::ChatRoom;
use crate::entities::conversations::{Conversation, ConversationKey};
use crate::entities::messages::{CreateMessageArgs, Message};
use crate::entities::users::User;
use crate::models::conversations::ConversationFilter;
use crate::models::messages::MessageTarget;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Row not found")]
    NotFound,

    #[error("Unique constraint violated")]
    UniqueViolation,

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) => match db.kind() {
                ErrorKind::UniqueViolation => StoreError::UniqueViolation,
                // a referenced row is gone
                ErrorKind::ForeignKeyViolation => StoreError::NotFound,
                ErrorKind::CheckViolation => {
                    let constraint = db.constraint().unwrap_or("unknown").to_owned();
                    StoreError::CheckViolation(constraint)
                }
                _ => StoreError::Database(e),
            },
            e => StoreError::Database(e),
        }
    }
}

/// Relational storage of the chat core, plus read access to the identity
/// tables (users, brands) owned by the surrounding platform.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn fetch_user(&self, user_id: i64) -> StoreResult<User>;
    async fn fetch_users(&self, user_ids: &[i64]) -> StoreResult<Vec<User>>;
    async fn fetch_user_by_username(&self, username: &str) -> StoreResult<User>;
    /// Case-insensitive.
    async fn fetch_user_by_email(&self, email: &str) -> StoreResult<User>;

    async fn fetch_brand(&self, brand_id: i64) -> StoreResult<Brand>;
    async fn fetch_brands(&self, brand_ids: &[i64]) -> StoreResult<Vec<Brand>>;

    async fn fetch_conversation(&self, conversation_id: i64) -> StoreResult<Conversation>;
    async fn find_conversation(&self, key: ConversationKey) -> StoreResult<Option<Conversation>>;
    /// Fails with [`StoreError::UniqueViolation`] when a row with the same key
    /// exists and with [`StoreError::CheckViolation`] for identical participants.
    async fn create_conversation(&self, key: ConversationKey) -> StoreResult<Conversation>;
    /// Most recently updated first.
    async fn fetch_conversations(
        &self,
        user_id: i64,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>>;
    async fn touch_conversation(&self, conversation_id: i64, at: DateTime<Utc>)
    -> StoreResult<()>;

    async fn fetch_room(&self, room_id: i64) -> StoreResult<ChatRoom>;

    async fn create_message(&self, args: CreateMessageArgs) -> StoreResult<Message>;
    /// Oldest first.
    async fn fetch_messages(&self, target: MessageTarget) -> StoreResult<Vec<Message>>;
    /// The newest message of each of the given conversations that has any.
    async fn fetch_latest_messages(&self, conversation_ids: &[i64]) -> StoreResult<Vec<Message>>;
    /// `(conversation_id, count)` of unread messages addressed to `user_id`
    /// across the conversations they participate in.
    async fn count_unread(&self, user_id: i64) -> StoreResult<Vec<(i64, i64)>>;
    async fn mark_read(&self, conversation_id: i64, reader_id: i64) -> StoreResult<u64>;
    /// Deletes a message of `target` that was not sent by `recipient_id`.
    /// Returns whether a row was removed.
    async fn delete_delivered(
        &self,
        message_id: i64,
        target: MessageTarget,
        recipient_id: i64,
    ) -> StoreResult<bool>;
}
