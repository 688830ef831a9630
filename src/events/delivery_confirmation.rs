use crate::common::context::Context;
use crate::entities::sessions::Session;
use crate::events::EventResult;
use crate::models::messages::MessageTarget;
use crate::usecases::messages;

pub async fn handle<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    message_id: i64,
) -> EventResult {
    messages::confirm_delivery(ctx, session, target, message_id).await?;
    Ok(None)
}
