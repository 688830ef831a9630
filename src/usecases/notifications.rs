use crate::common::context::Context;
use crate::entities::conversations::Conversation;
use crate::entities::messages::Message;
use crate::models::brands::BrandDisplay;
use crate::models::frames::OutboundFrame;
use crate::models::users::UserDisplay;
use crate::repositories::groups::{GroupEvent, GroupName};
use crate::usecases::groups;
use tracing::{error, warn};

/// Tells both participants about a conversation that was just created.
/// Failures are logged; the conversation itself is already stored.
pub async fn notify_new_conversation<C: Context + ?Sized>(ctx: &C, conversation: &Conversation) {
    let participants = match ctx.store().fetch_users(&conversation.participants()).await {
        Ok(users) => users,
        Err(e) => {
            error!(
                conversation_id = conversation.id,
                "Failed to load participants for notification: {e:?}"
            );
            return;
        }
    };
    let brand = match conversation.brand_id {
        Some(brand_id) => match ctx.store().fetch_brand(brand_id).await {
            Ok(brand) => Some(BrandDisplay::from(&brand)),
            Err(e) => {
                warn!(
                    conversation_id = conversation.id,
                    brand_id, "Announcing conversation without its brand: {e:?}"
                );
                None
            }
        },
        None => None,
    };

    for user_id in conversation.participants() {
        let counterparty_id = conversation.counterparty_of(user_id);
        let Some(counterparty) = participants.iter().find(|user| user.id == counterparty_id) else {
            warn!(
                conversation_id = conversation.id,
                user_id = counterparty_id,
                "Conversation participant no longer exists"
            );
            continue;
        };
        let frame = OutboundFrame::NewConversation {
            conversation_id: conversation.id,
            counterparty: UserDisplay::from(counterparty),
            brand: brand.clone(),
            created_at: conversation.created_at,
        };
        groups::publish(ctx, GroupName::User(user_id), GroupEvent::new(frame)).await;
    }
}

/// Tells both participants that a message was appended to the conversation.
pub async fn notify_conversation_updated<C: Context + ?Sized>(
    ctx: &C,
    conversation: &Conversation,
    message: &Message,
) {
    for user_id in conversation.participants() {
        let frame = OutboundFrame::ConversationUpdated {
            conversation_id: conversation.id,
            message_id: message.id,
            sender_id: message.sender_id,
            updated_at: message.timestamp,
        };
        groups::publish(ctx, GroupName::User(user_id), GroupEvent::new(frame)).await;
    }
}
