pub mod chat_message;
pub mod delivery_confirmation;
pub mod ping;
pub mod typing;

use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult};
use crate::entities::sessions::Session;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::models::messages::MessageTarget;

/// Frame to send back to the client that produced the event, if any.
pub type EventResult = ServiceResult<Option<OutboundFrame>>;

/// Handles a frame received on a chat socket attached to `target`.
pub async fn handle_chat_frame<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    frame: InboundFrame,
) -> EventResult {
    match frame {
        InboundFrame::ChatMessage { message } => {
            chat_message::handle(ctx, session, target, message).await
        }
        InboundFrame::Typing { is_typing } => typing::handle(ctx, session, target, is_typing).await,
        InboundFrame::DeliveryConfirmation { message_id } => {
            delivery_confirmation::handle(ctx, session, target, message_id).await
        }
        InboundFrame::Ping => ping::handle(),
        InboundFrame::StartStream { .. } | InboundFrame::StopStream => {
            Err(AppError::FramesUnknownType)
        }
    }
}
