use crate::common::error::ServiceResult;
use crate::common::state::AppState;
use crate::consumers::{Consumer, require_session};
use crate::entities::chat_rooms::ChatRoom;
use crate::entities::sessions::Session;
use crate::events;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::models::messages::MessageTarget;
use crate::repositories::groups::GroupName;
use crate::usecases::rooms;
use async_trait::async_trait;

/// Legacy brand-to-user chat room socket.
pub struct ChatRoomConsumer {
    ctx: AppState,
    session: Session,
    room: ChatRoom,
}

impl ChatRoomConsumer {
    pub async fn authorize(
        ctx: AppState,
        session: Option<Session>,
        room_id: i64,
    ) -> ServiceResult<Self> {
        let session = require_session(session)?;
        let room = rooms::authorize(&ctx, &session, room_id).await?;
        Ok(Self { ctx, session, room })
    }

    fn target(&self) -> MessageTarget {
        MessageTarget::Room(self.room.id)
    }
}

#[async_trait]
impl Consumer for ChatRoomConsumer {
    fn name(&self) -> &'static str {
        "chat_room"
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
