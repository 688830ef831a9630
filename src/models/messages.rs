use crate::entities::messages::{CreateMessageArgs, Message};
use crate::models::users::UserDisplay;
use crate::repositories::groups::GroupName;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Parent a message is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageTarget {
    Room(i64),
    Conversation(i64),
}

impl MessageTarget {
    pub fn group(self) -> GroupName {
        match self {
            MessageTarget::Room(room_id) => GroupName::Room(room_id),
            MessageTarget::Conversation(conversation_id) => {
                GroupName::Conversation(conversation_id)
            }
        }
    }

    pub fn contains(self, message: &Message) -> bool {
        match self {
            MessageTarget::Room(room_id) => message.room_id == Some(room_id),
            MessageTarget::Conversation(conversation_id) => {
                message.conversation_id == Some(conversation_id)
            }
        }
    }

    pub fn create_args(
        self,
        sender_id: i64,
        content: String,
        image: Option<String>,
    ) -> CreateMessageArgs {
        let (room_id, conversation_id) = match self {
            MessageTarget::Room(room_id) => (Some(room_id), None),
            MessageTarget::Conversation(conversation_id) => (None, Some(conversation_id)),
        };
        CreateMessageArgs {
            room_id,
            conversation_id,
            sender_id,
            content,
            image,
        }
    }
}

/// A message as returned to clients, with its content decrypted.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub sender: UserDisplay,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub id: i64,
    pub sender_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// Body of a message being sent. Blank text is allowed only with an image.
#[derive(Debug, Default)]
pub struct NewMessage {
    pub content: String,
    pub image: Option<String>,
}

impl NewMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            image: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.image.is_none()
    }
}

/// Raw image upload accompanying a message.
pub struct ImageUpload<'a> {
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_sets_exactly_one_parent() {
        let args = MessageTarget::Room(4).create_args(1, "x".to_owned(), None);
        assert_eq!((args.room_id, args.conversation_id), (Some(4), None));
        let args = MessageTarget::Conversation(9).create_args(1, "x".to_owned(), None);
        assert_eq!((args.room_id, args.conversation_id), (None, Some(9)));
    }

    #[test]
    fn blank_message_needs_an_image() {
        assert!(NewMessage::text("  \n").is_empty());
        assert!(!NewMessage::text("hi").is_empty());
        let image_only = NewMessage {
            content: String::new(),
            image: Some("chat_images/a.png".to_owned()),
        };
        assert!(!image_only.is_empty());
    }
}
