//! In-process [`ChatStore`] used by tests and local development.
//!
//! Mirrors the constraints of the relational schema: one conversation per
//! key, distinct participants, and exactly one parent per message.

use crate::entities::brands::Brand;
use crate::entities::chat_rooms::ChatRoom;
use crate::entities::conversations::{Conversation, ConversationKey};
use crate::entities::messages::{CreateMessageArgs, Message};
use crate::entities::users::User;
use crate::models::conversations::ConversationFilter;
use crate::models::messages::MessageTarget;
use crate::repositories::{ChatStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub const DISTINCT_PARTICIPANTS: &str = "chat_conversations_distinct_participants";
pub const SINGLE_PARENT: &str = "chat_messages_single_parent";

#[derive(Default)]
struct Tables {
    users: HashMap<i64, User>,
    brands: HashMap<i64, Brand>,
    rooms: HashMap<i64, ChatRoom>,
    conversations: BTreeMap<i64, Conversation>,
    messages: BTreeMap<i64, Message>,
    next_room_id: i64,
    next_conversation_id: i64,
    next_message_id: i64,
}

#[derive(Default)]
pub struct MemoryChatStore {
    tables: Mutex<Tables>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.tables.lock().users.insert(user.id, user);
    }

    pub fn insert_brand(&self, brand: Brand) {
        self.tables.lock().brands.insert(brand.id, brand);
    }

    pub fn insert_room(&self, brand_id: i64, user_id: i64) -> StoreResult<ChatRoom> {
        let mut tables = self.tables.lock();
        let exists = tables
            .rooms
            .values()
            .any(|room| room.brand_id == brand_id && room.user_id == user_id);
        if exists {
            return Err(StoreError::UniqueViolation);
        }
        tables.next_room_id += 1;
        let room = ChatRoom {
            id: tables.next_room_id,
            brand_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    pub fn fetch_message(&self, message_id: i64) -> Option<Message> {
        self.tables.lock().messages.get(&message_id).cloned()
    }

    pub fn conversation_count(&self) -> usize {
        self.tables.lock().conversations.len()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn fetch_user(&self, user_id: i64) -> StoreResult<User> {
        let tables = self.tables.lock();
        tables.users.get(&user_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn fetch_users(&self, user_ids: &[i64]) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn fetch_user_by_username(&self, username: &str) -> StoreResult<User> {
        let tables = self.tables.lock();
        tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn fetch_user_by_email(&self, email: &str) -> StoreResult<User> {
        let tables = self.tables.lock();
        tables
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn fetch_brand(&self, brand_id: i64) -> StoreResult<Brand> {
        let tables = self.tables.lock();
        tables.brands.get(&brand_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn fetch_brands(&self, brand_ids: &[i64]) -> StoreResult<Vec<Brand>> {
        let tables = self.tables.lock();
        Ok(brand_ids
            .iter()
            .filter_map(|id| tables.brands.get(id).cloned())
            .collect())
    }

    async fn fetch_conversation(&self, conversation_id: i64) -> StoreResult<Conversation> {
        let tables = self.tables.lock();
        tables
            .conversations
            .get(&conversation_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_conversation(&self, key: ConversationKey) -> StoreResult<Option<Conversation>> {
        let tables = self.tables.lock();
        Ok(tables
            .conversations
            .values()
            .find(|conversation| conversation.key() == key)
            .cloned())
    }

    async fn create_conversation(&self, key: ConversationKey) -> StoreResult<Conversation> {
        if key.participant1_id == key.participant2_id {
            return Err(StoreError::CheckViolation(DISTINCT_PARTICIPANTS.to_owned()));
        }
        let mut tables = self.tables.lock();
        if tables.conversations.values().any(|c| c.key() == key) {
            return Err(StoreError::UniqueViolation);
        }
        tables.next_conversation_id += 1;
        let now = Utc::now();
        let conversation = Conversation {
            id: tables.next_conversation_id,
            brand_id: key.brand_id,
            participant1_id: key.participant1_id,
            participant2_id: key.participant2_id,
            created_at: now,
            updated_at: now,
        };
        tables
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn fetch_conversations(
        &self,
        user_id: i64,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>> {
        let tables = self.tables.lock();
        let mut conversations: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|conversation| match filter {
                ConversationFilter::All => conversation.has_participant(user_id),
                ConversationFilter::Creators => {
                    conversation.has_participant(user_id) && conversation.brand_id.is_none()
                }
                ConversationFilter::Brands => conversation
                    .brand_id
                    .and_then(|brand_id| tables.brands.get(&brand_id))
                    .is_some_and(|brand| brand.owner_id == user_id),
            })
            .cloned()
            .collect();
        conversations.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(conversations)
    }

    async fn touch_conversation(
        &self,
        conversation_id: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        if let Some(conversation) = tables.conversations.get_mut(&conversation_id) {
            conversation.updated_at = at;
        }
        Ok(())
    }

    async fn fetch_room(&self, room_id: i64) -> StoreResult<ChatRoom> {
        let tables = self.tables.lock();
        tables.rooms.get(&room_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create_message(&self, args: CreateMessageArgs) -> StoreResult<Message> {
        let parent_exists = {
            let tables = self.tables.lock();
            match (args.room_id, args.conversation_id) {
                (Some(room_id), None) => tables.rooms.contains_key(&room_id),
                (None, Some(conversation_id)) => {
                    tables.conversations.contains_key(&conversation_id)
                }
                _ => return Err(StoreError::CheckViolation(SINGLE_PARENT.to_owned())),
            }
        };
        if !parent_exists {
            return Err(StoreError::NotFound);
        }

        let mut tables = self.tables.lock();
        tables.next_message_id += 1;
        let message = Message {
            id: tables.next_message_id,
            room_id: args.room_id,
            conversation_id: args.conversation_id,
            sender_id: args.sender_id,
            content: args.content,
            timestamp: Utc::now(),
            is_read: false,
            image: args.image,
        };
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn fetch_messages(&self, target: MessageTarget) -> StoreResult<Vec<Message>> {
        let tables = self.tables.lock();
        Ok(tables
            .messages
            .values()
            .filter(|message| target.contains(message))
            .cloned()
            .collect())
    }

    async fn fetch_latest_messages(&self, conversation_ids: &[i64]) -> StoreResult<Vec<Message>> {
        let tables = self.tables.lock();
        let mut latest: HashMap<i64, &Message> = HashMap::new();
        for message in tables.messages.values() {
            if let Some(conversation_id) = message.conversation_id
                && conversation_ids.contains(&conversation_id)
            {
                latest.insert(conversation_id, message);
            }
        }
        Ok(latest.into_values().cloned().collect())
    }

    async fn count_unread(&self, user_id: i64) -> StoreResult<Vec<(i64, i64)>> {
        let tables = self.tables.lock();
        let mut counts: HashMap<i64, i64> = HashMap::new();
        for message in tables.messages.values() {
            let Some(conversation) = message
                .conversation_id
                .and_then(|id| tables.conversations.get(&id))
            else {
                continue;
            };
            if conversation.has_participant(user_id)
                && message.sender_id != user_id
                && !message.is_read
            {
                *counts.entry(conversation.id).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn mark_read(&self, conversation_id: i64, reader_id: i64) -> StoreResult<u64> {
        let mut tables = self.tables.lock();
        let mut updated = 0;
        for message in tables.messages.values_mut() {
            if message.conversation_id == Some(conversation_id)
                && message.sender_id != reader_id
                && !message.is_read
            {
                message.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_delivered(
        &self,
        message_id: i64,
        target: MessageTarget,
        recipient_id: i64,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock();
        let deletable = tables
            .messages
            .get(&message_id)
            .is_some_and(|message| target.contains(message) && message.sender_id != recipient_id);
        if deletable {
            tables.messages.remove(&message_id);
        }
        Ok(deletable)
    }
}
