use crate::common::error::{AppError, ServiceResult};
use crate::common::state::AppState;
use crate::consumers::{Consumer, require_session};
use crate::entities::sessions::Session;
use crate::events::ping;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::repositories::groups::{GroupEvent, GroupName};
use crate::usecases::tweet_queue;
use async_trait::async_trait;

/// Forwards updates of a brand's tweet queue, published by the posting
/// automation on the queue's group.
pub struct TweetQueueConsumer {
    session: Session,
    organization_id: i64,
    brand_id: i64,
}

impl TweetQueueConsumer {
    pub async fn authorize(
        ctx: &AppState,
        session: Option<Session>,
        organization_id: i64,
        brand_id: i64,
    ) -> ServiceResult<Self> {
        let session = require_session(session)?;
        let brand = tweet_queue::authorize(ctx, &session, organization_id, brand_id).await?;
        Ok(Self {
            session,
            organization_id,
            brand_id: brand.id,
        })
    }
}

#[async_trait]
impl Consumer for TweetQueueConsumer {
    fn name(&self) -> &'static str {
        "tweet_queue"
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn group(&self) -> Option<GroupName> {
        Some(GroupName::TweetQueue {
            organization_id: self.organization_id,
            brand_id: self.brand_id,
        })
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
