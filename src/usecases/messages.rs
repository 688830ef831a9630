use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::entities::messages::Message;
use crate::entities::sessions::Session;
use crate::models::frames::OutboundFrame;
use crate::models::messages::{
    ImageUpload, LastMessage, MessageTarget, MessageView, NewMessage,
};
use crate::models::users::UserDisplay;
use crate::repositories::StoreError;
use crate::repositories::groups::GroupEvent;
use crate::usecases::{conversations, groups, notifications};
use hashbrown::HashMap;
use tracing::{debug, info};

/// Persists a message from the session's user and fans it out to the
/// target's group. Callers must have authorized the user for `target`.
pub async fn send<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    message: NewMessage,
) -> ServiceResult<MessageView> {
    if message.is_empty() {
        return Err(AppError::MessagesMissingContent);
    }
    let sender = match ctx.store().fetch_user(session.user_id).await {
        Ok(user) => UserDisplay::from(&user),
        Err(StoreError::NotFound) => return Err(AppError::UsersNotFound),
        Err(e) => return unexpected(e),
    };

    let content = ctx.cipher().ensure_encrypted(&message.content)?;
    let args = target.create_args(session.user_id, content, message.image);
    let stored = match ctx.store().create_message(args).await {
        Ok(stored) => stored,
        Err(StoreError::NotFound) => {
            return match target {
                MessageTarget::Room(_) => Err(AppError::RoomsNotFound),
                MessageTarget::Conversation(_) => Err(AppError::ConversationsNotFound),
            };
        }
        Err(e) => return unexpected(e),
    };
    info!(
        message_id = stored.id,
        sender_id = stored.sender_id,
        target = ?target,
        "Message stored"
    );

    let conversation = match target {
        MessageTarget::Conversation(conversation_id) => {
            if let Err(e) = ctx
                .store()
                .touch_conversation(conversation_id, stored.timestamp)
                .await
            {
                return unexpected(e);
            }
            match ctx.store().fetch_conversation(conversation_id).await {
                Ok(conversation) => Some(conversation),
                Err(e) => return unexpected(e),
            }
        }
        MessageTarget::Room(_) => None,
    };

    let view = to_view(ctx, &stored, sender);
    let frame = OutboundFrame::ChatMessage {
        message_id: view.id,
        message: view.content.clone(),
        user_id: view.sender.id,
        username: view.sender.username.clone(),
        timestamp: view.timestamp,
        image_url: view.image_url.clone(),
    };
    groups::publish(ctx, target.group(), GroupEvent::from_user(session.user_id, frame)).await;
    if let Some(conversation) = conversation {
        notifications::notify_conversation_updated(ctx, &conversation, &stored).await;
    }
    Ok(view)
}

/// Stores the uploaded image, then sends the message. The image is removed
/// again when the message cannot be persisted.
pub async fn send_with_image<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    content: String,
    upload: Option<ImageUpload<'_>>,
) -> ServiceResult<MessageView> {
    if content.trim().is_empty() && upload.is_none() {
        return Err(AppError::MessagesMissingContent);
    }
    let image = match upload {
        Some(upload) => Some(ctx.media().save_image(upload.filename, upload.data).await?),
        None => None,
    };
    let message = NewMessage {
        content,
        image: image.clone(),
    };
    match send(ctx, session, target, message).await {
        Ok(view) => Ok(view),
        Err(e) => {
            if let Some(path) = image {
                ctx.media().remove(&path).await;
            }
            Err(e)
        }
    }
}

/// Every undelivered message of a conversation, oldest first. Reading never
/// removes anything.
pub async fn list<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    conversation_id: i64,
) -> ServiceResult<Vec<MessageView>> {
    let conversation = conversations::authorize(ctx, session, conversation_id).await?;
    fetch_views(ctx, MessageTarget::Conversation(conversation.id)).await
}

/// Acknowledges that the session's user received a message, removing it
/// from storage. Unknown ids, messages of another target and the user's
/// own messages are ignored.
pub async fn confirm_delivery<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    target: MessageTarget,
    message_id: i64,
) -> ServiceResult<()> {
    match ctx
        .store()
        .delete_delivered(message_id, target, session.user_id)
        .await
    {
        Ok(true) => {
            info!(message_id, user_id = session.user_id, "Delivered message removed");
            Ok(())
        }
        Ok(false) => {
            debug!(message_id, user_id = session.user_id, "Nothing to confirm");
            Ok(())
        }
        Err(e) => unexpected(e),
    }
}

pub(crate) async fn fetch_views<C: Context + ?Sized>(
    ctx: &C,
    target: MessageTarget,
) -> ServiceResult<Vec<MessageView>> {
    let messages = match ctx.store().fetch_messages(target).await {
        Ok(messages) => messages,
        Err(e) => return unexpected(e),
    };
    let mut sender_ids: Vec<i64> = messages.iter().map(|m| m.sender_id).collect();
    sender_ids.sort_unstable();
    sender_ids.dedup();
    let senders: HashMap<i64, UserDisplay> = match ctx.store().fetch_users(&sender_ids).await {
        Ok(users) => users.iter().map(|u| (u.id, UserDisplay::from(u))).collect(),
        Err(e) => return unexpected(e),
    };

    let views = messages
        .iter()
        .map(|message| {
            let sender = senders
                .get(&message.sender_id)
                .cloned()
                .unwrap_or_else(|| deleted_user(message.sender_id));
            to_view(ctx, message, sender)
        })
        .collect();
    Ok(views)
}

pub(crate) fn last_message<C: Context + ?Sized>(ctx: &C, message: Message) -> LastMessage {
    LastMessage {
        id: message.id,
        sender_id: message.sender_id,
        content: ctx.cipher().decrypt_or_raw(&message.content),
        timestamp: message.timestamp,
        image_url: message.image.as_deref().map(|path| ctx.media().url_for(path)),
    }
}

fn to_view<C: Context + ?Sized>(ctx: &C, message: &Message, sender: UserDisplay) -> MessageView {
    MessageView {
        id: message.id,
        sender,
        content: ctx.cipher().decrypt_or_raw(&message.content),
        timestamp: message.timestamp,
        is_read: message.is_read,
        image_url: message.image.as_deref().map(|path| ctx.media().url_for(path)),
    }
}

fn deleted_user(user_id: i64) -> UserDisplay {
    UserDisplay {
        id: user_id,
        username: "deleted user".to_owned(),
        profile_image: None,
    }
}
