use crate::common::error::{AppError, ServiceResult};
use crate::entities::conversations::Conversation;
use crate::models::brands::BrandDisplay;
use crate::models::messages::{LastMessage, MessageView};
use crate::models::users::UserDisplay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ConversationFilter {
    #[default]
    All,
    /// Brand-less conversations between two users
    Creators,
    /// Conversations held on behalf of a brand the caller owns
    Brands,
}

impl ConversationFilter {
    pub fn from_query(value: Option<&str>) -> ServiceResult<Self> {
        match value {
            None | Some("") => Ok(ConversationFilter::All),
            Some("creators") => Ok(ConversationFilter::Creators),
            Some("brands") => Ok(ConversationFilter::Brands),
            Some(_) => Err(AppError::ConversationsInvalidFilter),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Creator,
    Brand,
}

impl ConversationKind {
    pub fn of(conversation: &Conversation) -> Self {
        match conversation.brand_id {
            Some(_) => ConversationKind::Brand,
            None => ConversationKind::Creator,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub id: i64,
    pub kind: ConversationKind,
    pub brand: Option<BrandDisplay>,
    pub counterparty: UserDisplay,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: ConversationView,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedConversation {
    pub conversation: ConversationView,
    pub created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub unread_messages: i64,
    pub creator_conversations: usize,
    pub brand_conversations: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListConversationsArgs {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartWithEmailRequest {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter() {
        assert_eq!(ConversationFilter::from_query(None), Ok(ConversationFilter::All));
        assert_eq!(
            ConversationFilter::from_query(Some("creators")),
            Ok(ConversationFilter::Creators)
        );
        assert_eq!(
            ConversationFilter::from_query(Some("brands")),
            Ok(ConversationFilter::Brands)
        );
        assert_eq!(
            ConversationFilter::from_query(Some("agencies")),
            Err(AppError::ConversationsInvalidFilter)
        );
    }
}
