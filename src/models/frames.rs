//! JSON frames exchanged over the realtime sockets. Every frame is an object
//! tagged by its `type` field.

use crate::common::error::AppError;
use crate::models::brands::BrandDisplay;
use crate::models::users::UserDisplay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    ChatMessage {
        message: String,
    },
    Typing {
        #[serde(default = "default_is_typing")]
        is_typing: bool,
    },
    DeliveryConfirmation {
        message_id: i64,
    },
    Ping,
    StartStream {
        source: String,
    },
    StopStream,
}

fn default_is_typing() -> bool {
    true
}

const INBOUND_TYPES: &[&str] = &[
    "chat_message",
    "typing",
    "delivery_confirmation",
    "ping",
    "start_stream",
    "stop_stream",
];

impl InboundFrame {
    /// Parses a text frame, telling apart malformed JSON, unknown frame types
    /// and known frames with missing or mistyped fields.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text).map_err(|_| AppError::FramesInvalidJson)?;
        let frame_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(AppError::FramesInvalidFrame)?;
        if !INBOUND_TYPES.contains(&frame_type) {
            return Err(AppError::FramesUnknownType);
        }
        serde_json::from_value(value).map_err(|_| AppError::FramesInvalidFrame)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundFrame::ChatMessage { .. } => "chat_message",
            InboundFrame::Typing { .. } => "typing",
            InboundFrame::DeliveryConfirmation { .. } => "delivery_confirmation",
            InboundFrame::Ping => "ping",
            InboundFrame::StartStream { .. } => "start_stream",
            InboundFrame::StopStream => "stop_stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    ConnectionEstablished {
        group: Option<String>,
        user_id: i64,
    },
    ChatMessage {
        message_id: i64,
        message: String,
        user_id: i64,
        username: String,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    TypingIndicator {
        user_id: i64,
        username: String,
        is_typing: bool,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    Error {
        code: String,
        message: String,
    },
    NewConversation {
        conversation_id: i64,
        counterparty: UserDisplay,
        brand: Option<BrandDisplay>,
        created_at: DateTime<Utc>,
    },
    ConversationUpdated {
        conversation_id: i64,
        message_id: i64,
        sender_id: i64,
        updated_at: DateTime<Utc>,
    },
    /// Published by the posting automation, forwarded untouched.
    TweetQueueUpdate(Map<String, Value>),
    LogSources {
        sources: Vec<String>,
    },
    LogStreamStarted {
        source: String,
    },
    LogLine {
        source: String,
        line: String,
    },
    LogStreamStopped {
        source: String,
        reason: String,
    },
}

impl OutboundFrame {
    pub fn error(e: &AppError) -> Self {
        OutboundFrame::Error {
            code: e.code().to_owned(),
            message: e.message().to_owned(),
        }
    }

    pub fn pong() -> Self {
        OutboundFrame::Pong {
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_chat_frames() {
        assert_eq!(
            InboundFrame::parse(r#"{"type":"chat_message","message":"hello"}"#),
            Ok(InboundFrame::ChatMessage {
                message: "hello".to_owned()
            })
        );
        assert_eq!(
            InboundFrame::parse(r#"{"type":"typing"}"#),
            Ok(InboundFrame::Typing { is_typing: true })
        );
        assert_eq!(
            InboundFrame::parse(r#"{"type":"typing","is_typing":false}"#),
            Ok(InboundFrame::Typing { is_typing: false })
        );
        assert_eq!(
            InboundFrame::parse(r#"{"type":"delivery_confirmation","message_id":12}"#),
            Ok(InboundFrame::DeliveryConfirmation { message_id: 12 })
        );
        assert_eq!(InboundFrame::parse(r#"{"type":"ping"}"#), Ok(InboundFrame::Ping));
    }

    #[test]
    fn classifies_bad_frames() {
        assert_eq!(InboundFrame::parse("{nope"), Err(AppError::FramesInvalidJson));
        assert_eq!(
            InboundFrame::parse(r#"{"type":"dance"}"#),
            Err(AppError::FramesUnknownType)
        );
        assert_eq!(
            InboundFrame::parse(r#"{"type":"chat_message"}"#),
            Err(AppError::FramesInvalidFrame)
        );
        assert_eq!(
            InboundFrame::parse(r#"{"type":"delivery_confirmation","message_id":"x"}"#),
            Err(AppError::FramesInvalidFrame)
        );
        assert_eq!(InboundFrame::parse(r#"[1,2]"#), Err(AppError::FramesInvalidFrame));
    }

    #[test]
    fn outbound_frames_are_tagged() {
        let frame = OutboundFrame::TypingIndicator {
            user_id: 3,
            username: "alice".to_owned(),
            is_typing: true,
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "typing_indicator", "user_id": 3, "username": "alice", "is_typing": true})
        );

        let error = serde_json::to_value(OutboundFrame::error(&AppError::FramesUnknownType)).unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["code"], "frames.unknown_type");
    }

    #[test]
    fn tweet_queue_updates_pass_through() {
        let published = json!({"type": "tweet_queue_update", "tweet_id": 5, "status": "posted"});
        let frame: OutboundFrame = serde_json::from_value(published.clone()).unwrap();
        assert!(matches!(frame, OutboundFrame::TweetQueueUpdate(_)));
        assert_eq!(serde_json::to_value(&frame).unwrap(), published);
    }
}
