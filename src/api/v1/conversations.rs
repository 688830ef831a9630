use crate::api::RequestContext;
use crate::common::error::{AppError, ServiceResponse, ServiceResult};
use crate::models::conversations::{
    ConversationDetail, ConversationFilter, ConversationStats, ConversationView,
    ListConversationsArgs, StartWithEmailRequest, StartedConversation,
};
use crate::models::messages::{ImageUpload, MessageTarget, MessageView};
use crate::usecases::{conversations, messages};
use axum::Json;
use axum::extract::{Multipart, Path, Query};
use axum::http::StatusCode;
use tracing::warn;

pub async fn list(
    ctx: RequestContext,
    Query(args): Query<ListConversationsArgs>,
) -> ServiceResponse<Vec<ConversationView>> {
    let filter = ConversationFilter::from_query(args.kind.as_deref())?;
    let conversations = conversations::list(&ctx, &ctx.session, filter).await?;
    Ok(Json(conversations))
}

pub async fn stats(ctx: RequestContext) -> ServiceResponse<ConversationStats> {
    let stats = conversations::stats(&ctx, &ctx.session).await?;
    Ok(Json(stats))
}

pub async fn retrieve(
    ctx: RequestContext,
    Path(conversation_id): Path<i64>,
) -> ServiceResponse<ConversationDetail> {
    let detail = conversations::retrieve(&ctx, &ctx.session, conversation_id).await?;
    Ok(Json(detail))
}

pub async fn list_messages(
    ctx: RequestContext,
    Path(conversation_id): Path<i64>,
) -> ServiceResponse<Vec<MessageView>> {
    let messages = messages::list(&ctx, &ctx.session, conversation_id).await?;
    Ok(Json(messages))
}

/// Accepts a `content` text field and an optional `image` file field.
pub async fn create_message(
    ctx: RequestContext,
    Path(conversation_id): Path<i64>,
    mut multipart: Multipart,
) -> ServiceResult<(StatusCode, Json<MessageView>)> {
    let conversation = conversations::authorize(&ctx, &ctx.session, conversation_id).await?;

    let mut content = String::new();
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::DecodingRequestFailed)?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("content") => {
                content = field.text().await.map_err(|_| AppError::DecodingRequestFailed)?;
            }
            Some("image") => {
                let filename = field.file_name().map(str::to_owned);
                let data = field.bytes().await.map_err(|_| AppError::MessagesInvalidImage)?;
                image = Some((filename, data));
            }
            name => warn!(field = ?name, "Ignoring unknown multipart field"),
        }
    }

    let upload = image.as_ref().map(|(filename, data)| ImageUpload {
        filename: filename.as_deref(),
        data: &data[..],
    });
    let target = MessageTarget::Conversation(conversation.id);
    let view = messages::send_with_image(&ctx, &ctx.session, target, content, upload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn start_with_user(
    ctx: RequestContext,
    Path(user_id): Path<i64>,
) -> ServiceResult<(StatusCode, Json<StartedConversation>)> {
    let started = conversations::start_with_user(&ctx, &ctx.session, user_id).await?;
    Ok(started_response(started))
}

pub async fn start_with_brand(
    ctx: RequestContext,
    Path(brand_id): Path<i64>,
) -> ServiceResult<(StatusCode, Json<StartedConversation>)> {
    let started = conversations::start_with_brand(&ctx, &ctx.session, brand_id).await?;
    Ok(started_response(started))
}

pub async fn start_with_email(
    ctx: RequestContext,
    Json(args): Json<StartWithEmailRequest>,
) -> ServiceResult<(StatusCode, Json<StartedConversation>)> {
    let started = conversations::start_with_email(&ctx, &ctx.session, &args.email).await?;
    Ok(started_response(started))
}

fn started_response(started: StartedConversation) -> (StatusCode, Json<StartedConversation>) {
    let status = match started.created {
        true => StatusCode::CREATED,
        false => StatusCode::OK,
    };
    (status, Json(started))
}
