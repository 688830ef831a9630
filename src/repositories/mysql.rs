use crate::entities::brands::Brand;
use crate::entities::chat_rooms::ChatRoom;
use crate::entities::conversations::{Conversation, ConversationKey};
use crate::entities::messages::{CreateMessageArgs, Message};
use crate::entities::users::User;
use crate::models::conversations::ConversationFilter;
use crate::models::messages::MessageTarget;
use crate::repositories::{
    ChatStore, StoreResult, brands, chat_rooms, conversations, messages, users,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

pub struct MySqlChatStore {
    db: MySqlPool,
}

impl MySqlChatStore {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatStore for MySqlChatStore {
    async fn fetch_user(&self, user_id: i64) -> StoreResult<User> {
        Ok(users::fetch_one(&self.db, user_id).await?)
    }

    async fn fetch_users(&self, user_ids: &[i64]) -> StoreResult<Vec<User>> {
        Ok(users::fetch_many(&self.db, user_ids).await?)
    }

    async fn fetch_user_by_username(&self, username: &str) -> StoreResult<User> {
        Ok(users::fetch_one_by_username(&self.db, username).await?)
    }

    async fn fetch_user_by_email(&self, email: &str) -> StoreResult<User> {
        Ok(users::fetch_one_by_email(&self.db, email).await?)
    }

    async fn fetch_brand(&self, brand_id: i64) -> StoreResult<Brand> {
        Ok(brands::fetch_one(&self.db, brand_id).await?)
    }

    async fn fetch_brands(&self, brand_ids: &[i64]) -> StoreResult<Vec<Brand>> {
        Ok(brands::fetch_many(&self.db, brand_ids).await?)
    }

    async fn fetch_conversation(&self, conversation_id: i64) -> StoreResult<Conversation> {
        Ok(conversations::fetch_one(&self.db, conversation_id).await?)
    }

    async fn find_conversation(&self, key: ConversationKey) -> StoreResult<Option<Conversation>> {
        Ok(conversations::fetch_one_by_key(&self.db, key).await?)
    }

    async fn create_conversation(&self, key: ConversationKey) -> StoreResult<Conversation> {
        Ok(conversations::create(&self.db, key).await?)
    }

    async fn fetch_conversations(
        &self,
        user_id: i64,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>> {
        Ok(conversations::fetch_for_user(&self.db, user_id, filter).await?)
    }

    async fn touch_conversation(
        &self,
        conversation_id: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        Ok(conversations::touch(&self.db, conversation_id, at).await?)
    }

    async fn fetch_room(&self, room_id: i64) -> StoreResult<ChatRoom> {
        Ok(chat_rooms::fetch_one(&self.db, room_id).await?)
    }

    async fn create_message(&self, args: CreateMessageArgs) -> StoreResult<Message> {
        Ok(messages::create(&self.db, args).await?)
    }

    async fn fetch_messages(&self, target: MessageTarget) -> StoreResult<Vec<Message>> {
        Ok(messages::fetch_for_target(&self.db, target).await?)
    }

    async fn fetch_latest_messages(&self, conversation_ids: &[i64]) -> StoreResult<Vec<Message>> {
        Ok(messages::fetch_latest(&self.db, conversation_ids).await?)
    }

    async fn count_unread(&self, user_id: i64) -> StoreResult<Vec<(i64, i64)>> {
        Ok(messages::count_unread(&self.db, user_id).await?)
    }

    async fn mark_read(&self, conversation_id: i64, reader_id: i64) -> StoreResult<u64> {
        Ok(messages::mark_read(&self.db, conversation_id, reader_id).await?)
    }

    async fn delete_delivered(
        &self,
        message_id: i64,
        target: MessageTarget,
        recipient_id: i64,
    ) -> StoreResult<bool> {
        Ok(messages::delete_delivered(&self.db, message_id, target, recipient_id).await?)
    }
}
