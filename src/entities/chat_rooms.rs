use chrono::{DateTime, Utc};

/// Legacy brand-to-user room, superseded by conversations.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatRoom {
    pub id: i64,
    pub brand_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}
