use crate::common::error::{AppError, ServiceResult};
use crate::consumers::{Consumer, require_session};
use crate::entities::sessions::Session;
use crate::events::ping;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::repositories::groups::{GroupEvent, GroupName};
use async_trait::async_trait;

/// Private per-user stream of conversation lifecycle events.
pub struct NotificationsConsumer {
    session: Session,
}

impl NotificationsConsumer {
    pub fn authorize(session: Option<Session>) -> ServiceResult<Self> {
        let session = require_session(session)?;
        Ok(Self { session })
    }
}

#[async_trait]
impl Consumer for NotificationsConsumer {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn group(&self) -> Option<GroupName> {
        Some(GroupName::User(self.session.user_id))
    }

    fn accepts(&self, _event: &GroupEvent) -> bool {
        true
    }

    async fn on_frame(&mut self, frame: InboundFrame) -> ServiceResult<Option<OutboundFrame>> {
        match frame {
            InboundFrame::Ping => ping::handle(),
            _ => Err(AppError::FramesUnknownType),
        }
    }
}
