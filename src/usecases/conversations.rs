use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::entities::conversations::{Conversation, ConversationKey};
use crate::entities::sessions::Session;
use crate::models::brands::BrandDisplay;
use crate::models::conversations::{
    ConversationDetail, ConversationFilter, ConversationKind, ConversationStats,
    ConversationView, StartedConversation,
};
use crate::models::messages::{LastMessage, MessageTarget};
use crate::models::users::UserDisplay;
use crate::repositories::StoreError;
use crate::usecases::{messages, notifications};
use hashbrown::HashMap;
use tracing::{info, warn};

const RESOLVE_ATTEMPTS: usize = 3;

pub async fn start_with_user<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    user_id: i64,
) -> ServiceResult<StartedConversation> {
    if user_id == session.user_id {
        return Err(AppError::ConversationsSelfConversation);
    }
    match ctx.store().fetch_user(user_id).await {
        Ok(user) if user.is_active => {}
        Ok(_) | Err(StoreError::NotFound) => return Err(AppError::UsersNotFound),
        Err(e) => return unexpected(e),
    }
    let key = ConversationKey::between_users(session.user_id, user_id);
    start(ctx, session, key).await
}

pub async fn start_with_brand<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    brand_id: i64,
) -> ServiceResult<StartedConversation> {
    let brand = match ctx.store().fetch_brand(brand_id).await {
        Ok(brand) => brand,
        Err(StoreError::NotFound) => return Err(AppError::BrandsNotFound),
        Err(e) => return unexpected(e),
    };
    if brand.owner_id == session.user_id {
        return Err(AppError::ConversationsOwnBrand);
    }
    let key = ConversationKey::for_brand(brand.owner_id, session.user_id, brand.id);
    start(ctx, session, key).await
}

pub async fn start_with_email<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    email: &str,
) -> ServiceResult<StartedConversation> {
    let user = match ctx.store().fetch_user_by_email(email.trim()).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::UsersNotFound),
        Err(e) => return unexpected(e),
    };
    start_with_user(ctx, session, user.id).await
}

async fn start<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    key: ConversationKey,
) -> ServiceResult<StartedConversation> {
    let (conversation, created) = resolve(ctx, key).await?;
    if created {
        notifications::notify_new_conversation(ctx, &conversation).await;
    }
    let conversation = view_one(ctx, session.user_id, conversation).await?;
    Ok(StartedConversation {
        conversation,
        created,
    })
}

/// Get-or-create keyed on the storage uniqueness constraint. Losing a
/// creation race to a concurrent request yields the winner's row.
pub async fn resolve<C: Context + ?Sized>(
    ctx: &C,
    key: ConversationKey,
) -> ServiceResult<(Conversation, bool)> {
    for _ in 0..RESOLVE_ATTEMPTS {
        match ctx.store().find_conversation(key).await {
            Ok(Some(conversation)) => return Ok((conversation, false)),
            Ok(None) => {}
            Err(e) => return unexpected(e),
        }
        match ctx.store().create_conversation(key).await {
            Ok(conversation) => {
                info!(
                    conversation_id = conversation.id,
                    participant1_id = key.participant1_id,
                    participant2_id = key.participant2_id,
                    brand_id = ?key.brand_id,
                    "Conversation created"
                );
                return Ok((conversation, true));
            }
            Err(StoreError::UniqueViolation) => {
                warn!(?key, "Conversation created concurrently, retrying lookup");
            }
            Err(StoreError::CheckViolation(_)) => {
                return Err(AppError::ConversationsSelfConversation);
            }
            Err(e) => return unexpected(e),
        }
    }
    unexpected(anyhow::anyhow!(
        "Conversation {key:?} unresolved after {RESOLVE_ATTEMPTS} attempts"
    ))
}

/// Loads a conversation the caller participates in, or whose brand they own.
pub async fn authorize<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    conversation_id: i64,
) -> ServiceResult<Conversation> {
    let conversation = match ctx.store().fetch_conversation(conversation_id).await {
        Ok(conversation) => conversation,
        Err(StoreError::NotFound) => return Err(AppError::ConversationsNotFound),
        Err(e) => return unexpected(e),
    };
    if conversation.has_participant(session.user_id) {
        return Ok(conversation);
    }
    let Some(brand_id) = conversation.brand_id else {
        return Err(AppError::ConversationsForbidden);
    };
    match ctx.store().fetch_brand(brand_id).await {
        Ok(brand) if brand.owner_id == session.user_id => Ok(conversation),
        Ok(_) | Err(StoreError::NotFound) => Err(AppError::ConversationsForbidden),
        Err(e) => unexpected(e),
    }
}

pub async fn list<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    filter: ConversationFilter,
) -> ServiceResult<Vec<ConversationView>> {
    let conversations = match ctx.store().fetch_conversations(session.user_id, filter).await {
        Ok(conversations) => conversations,
        Err(e) => return unexpected(e),
    };
    build_views(ctx, session.user_id, conversations).await
}

/// Returns the conversation with all of its messages, marking every message
/// addressed to the caller as read.
pub async fn retrieve<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    conversation_id: i64,
) -> ServiceResult<ConversationDetail> {
    let conversation = authorize(ctx, session, conversation_id).await?;
    match ctx.store().mark_read(conversation.id, session.user_id).await {
        Ok(0) => {}
        Ok(updated) => info!(
            conversation_id,
            user_id = session.user_id,
            updated,
            "Marked messages as read"
        ),
        Err(e) => return unexpected(e),
    }
    let messages =
        messages::fetch_views(ctx, MessageTarget::Conversation(conversation.id)).await?;
    let conversation = view_one(ctx, session.user_id, conversation).await?;
    Ok(ConversationDetail {
        conversation,
        messages,
    })
}

pub async fn stats<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
) -> ServiceResult<ConversationStats> {
    let conversations = match ctx
        .store()
        .fetch_conversations(session.user_id, ConversationFilter::All)
        .await
    {
        Ok(conversations) => conversations,
        Err(e) => return unexpected(e),
    };
    let unread_messages = match ctx.store().count_unread(session.user_id).await {
        Ok(counts) => counts.iter().map(|(_, count)| count).sum(),
        Err(e) => return unexpected(e),
    };
    let brand_conversations = conversations
        .iter()
        .filter(|c| ConversationKind::of(c) == ConversationKind::Brand)
        .count();
    Ok(ConversationStats {
        total_conversations: conversations.len(),
        unread_messages,
        creator_conversations: conversations.len() - brand_conversations,
        brand_conversations,
    })
}

async fn view_one<C: Context + ?Sized>(
    ctx: &C,
    viewer_id: i64,
    conversation: Conversation,
) -> ServiceResult<ConversationView> {
    let conversation_id = conversation.id;
    match build_views(ctx, viewer_id, vec![conversation]).await?.pop() {
        Some(view) => Ok(view),
        None => unexpected(anyhow::anyhow!(
            "Conversation {conversation_id} has no counterparty"
        )),
    }
}

/// Attaches counterparty, brand, last message and unread count, batching the
/// lookups over all given conversations.
async fn build_views<C: Context + ?Sized>(
    ctx: &C,
    viewer_id: i64,
    conversations: Vec<Conversation>,
) -> ServiceResult<Vec<ConversationView>> {
    if conversations.is_empty() {
        return Ok(vec![]);
    }
    let store = ctx.store();
    let user_ids: Vec<i64> = conversations
        .iter()
        .map(|c| c.counterparty_of(viewer_id))
        .collect();
    let brand_ids: Vec<i64> = conversations.iter().filter_map(|c| c.brand_id).collect();
    let conversation_ids: Vec<i64> = conversations.iter().map(|c| c.id).collect();

    let users: HashMap<i64, UserDisplay> = match store.fetch_users(&user_ids).await {
        Ok(users) => users.iter().map(|u| (u.id, UserDisplay::from(u))).collect(),
        Err(e) => return unexpected(e),
    };
    let brands: HashMap<i64, BrandDisplay> = match store.fetch_brands(&brand_ids).await {
        Ok(brands) => brands.iter().map(|b| (b.id, BrandDisplay::from(b))).collect(),
        Err(e) => return unexpected(e),
    };
    let mut last_messages: HashMap<i64, LastMessage> =
        match store.fetch_latest_messages(&conversation_ids).await {
            Ok(latest) => latest
                .into_iter()
                .filter_map(|message| {
                    let conversation_id = message.conversation_id?;
                    Some((conversation_id, messages::last_message(ctx, message)))
                })
                .collect(),
            Err(e) => return unexpected(e),
        };
    let unread: HashMap<i64, i64> = match store.count_unread(viewer_id).await {
        Ok(counts) => counts.into_iter().collect(),
        Err(e) => return unexpected(e),
    };

    let views = conversations
        .into_iter()
        .filter_map(|conversation| {
            let counterparty_id = conversation.counterparty_of(viewer_id);
            let Some(counterparty) = users.get(&counterparty_id) else {
                warn!(
                    conversation_id = conversation.id,
                    user_id = counterparty_id,
                    "Skipping conversation with a missing counterparty"
                );
                return None;
            };
            Some(ConversationView {
                id: conversation.id,
                kind: ConversationKind::of(&conversation),
                brand: conversation
                    .brand_id
                    .and_then(|brand_id| brands.get(&brand_id).cloned()),
                counterparty: counterparty.clone(),
                last_message: last_messages.remove(&conversation.id),
                unread_count: unread.get(&conversation.id).copied().unwrap_or(0),
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
            })
        })
        .collect();
    Ok(views)
}
