use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub room_id: Option<i64>,
    pub conversation_id: Option<i64>,
    pub sender_id: i64,
    /// Always ciphertext.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub image: Option<String>,
}

/// Exactly one of `room_id` and `conversation_id` must be set; storage
/// rejects every other combination.
#[derive(Debug, Clone)]
pub struct CreateMessageArgs {
    pub room_id: Option<i64>,
    pub conversation_id: Option<i64>,
    pub sender_id: i64,
    pub content: String,
    pub image: Option<String>,
}
