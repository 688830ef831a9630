use crate::common::context::Context;
use crate::entities::sessions::Session;
use crate::events::EventResult;
use crate::models::messages::{MessageTarget, NewMessage};
use crate::usecases::messages;

pub async fn handle<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    message: String,
) -> EventResult {
    // the sender is not echoed, its own group event is filtered out
    messages::send(ctx, session, target, NewMessage::text(message)).await?;
    Ok(None)
}
