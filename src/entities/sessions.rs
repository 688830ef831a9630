use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, timeout: Duration) -> bool {
        let timeout = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
        self.updated_at
            .checked_add_signed(timeout)
            .is_some_and(|expires_at| expires_at < Utc::now())
    }
}

pub struct CreateSessionArgs {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
}
