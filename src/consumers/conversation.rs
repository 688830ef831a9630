use crate::common::error::ServiceResult;
use crate::common::state::AppState;
use crate::consumers::{Consumer, require_session};
use crate::entities::conversations::Conversation;
use crate::entities::sessions::Session;
use crate::events;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::models::messages::MessageTarget;
use crate::repositories::groups::GroupName;
use crate::usecases::conversations;
use async_trait::async_trait;

/// Chat socket of a conversation, open to its participants and to the
/// owner of its brand.
pub struct ConversationConsumer {
    ctx: AppState,
    session: Session,
    conversation: Conversation,
}

impl ConversationConsumer {
    pub async fn authorize(
        ctx: AppState,
        session: Option<Session>,
        conversation_id: i64,
    ) -> ServiceResult<Self> {
        let session = require_session(session)?;
        let conversation = conversations::authorize(&ctx, &session, conversation_id).await?;
        Ok(Self {
            ctx,
            session,
            conversation,
        })
    }

    fn target(&self) -> MessageTarget {
        MessageTarget::Conversation(self.conversation.id)
    }
}

#[async_trait]
impl Consumer for ConversationConsumer {
    fn name(&self) -> &'static str {
        "conversation"
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn group(&self) -> Option<GroupName> {
        Some(self.target().group())
    }

    async fn on_frame(&mut self, frame: InboundFrame) -> ServiceResult<Option<OutboundFrame>> {
        events::handle_chat_frame(&self.ctx, &self.session, self.target(), frame).await
    }
}
