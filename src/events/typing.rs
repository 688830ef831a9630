use crate::common::context::Context;
use crate::entities::sessions::Session;
use crate::events::EventResult;
use crate::models::frames::OutboundFrame;
use crate::models::messages::MessageTarget;
use crate::repositories::groups::GroupEvent;
use crate::usecases::groups;

pub async fn handle<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    is_typing: bool,
) -> EventResult {
    let frame = OutboundFrame::TypingIndicator {
        user_id: session.user_id,
        username: session.username.clone(),
        is_typing,
    };
    groups::publish(ctx, target.group(), GroupEvent::from_user(session.user_id, frame)).await;
    Ok(None)
}
