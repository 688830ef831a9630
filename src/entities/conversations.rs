use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    pub brand_id: Option<i64>,
    pub participant1_id: i64,
    pub participant2_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn key(&self) -> ConversationKey {
        ConversationKey {
            participant1_id: self.participant1_id,
            participant2_id: self.participant2_id,
            brand_id: self.brand_id,
        }
    }

    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participant1_id == user_id || self.participant2_id == user_id
    }

    /// The other participant, as seen by `user_id`.
    pub fn counterparty_of(&self, user_id: i64) -> i64 {
        match self.participant1_id == user_id {
            true => self.participant2_id,
            false => self.participant1_id,
        }
    }

    pub fn participants(&self) -> [i64; 2] {
        [self.participant1_id, self.participant2_id]
    }
}

/// Identity of a conversation: at most one row exists per key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub participant1_id: i64,
    pub participant2_id: i64,
    pub brand_id: Option<i64>,
}

impl ConversationKey {
    /// Brand-less conversation; the lower user id is always `participant1`.
    pub fn between_users(user_a: i64, user_b: i64) -> Self {
        Self {
            participant1_id: user_a.min(user_b),
            participant2_id: user_a.max(user_b),
            brand_id: None,
        }
    }

    /// Conversation between a brand (represented by its owner) and a user.
    pub fn for_brand(owner_id: i64, user_id: i64, brand_id: i64) -> Self {
        Self {
            participant1_id: owner_id,
            participant2_id: user_id,
            brand_id: Some(brand_id),
        }
    }
}
