use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::entities::sessions::{CreateSessionArgs, Session};
use crate::repositories::StoreError;
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

pub async fn login<C: Context + ?Sized>(
    ctx: &C,
    username: &str,
    password: &str,
) -> ServiceResult<Session> {
    let user = match ctx.store().fetch_user_by_username(username).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::SessionsInvalidCredentials),
        Err(e) => return unexpected(e),
    };

    if !bcrypt::verify(password, &user.password_hash)? {
        return Err(AppError::SessionsInvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::SessionsLoginForbidden);
    }

    let session = ctx
        .sessions()
        .create(CreateSessionArgs {
            user_id: user.id,
            username: user.username,
            is_staff: user.is_staff,
        })
        .await?;
    info!(user_id = session.user_id, "User logged in");
    Ok(session)
}

/// Resolves a token into its session, refreshing its idle timer. Expired
/// sessions are removed and reported as missing.
pub async fn authenticate<C: Context + ?Sized>(ctx: &C, session_id: Uuid) -> ServiceResult<Session> {
    match ctx.sessions().fetch_one(session_id).await {
        Ok(Some(session)) if session.is_expired(ctx.session_timeout()) => {
            ctx.sessions().delete(&session).await?;
            Err(AppError::SessionsNotFound)
        }
        Ok(Some(mut session)) => {
            session.updated_at = Utc::now();
            Ok(ctx.sessions().update(session).await?)
        }
        Ok(None) => Err(AppError::SessionsNotFound),
        Err(e) => unexpected(e),
    }
}

pub async fn logout<C: Context + ?Sized>(ctx: &C, session: &Session) -> ServiceResult<()> {
    ctx.sessions().delete(session).await?;
    info!(user_id = session.user_id, "User logged out");
    Ok(())
}

pub async fn fetch_all<C: Context + ?Sized>(ctx: &C) -> ServiceResult<Vec<Session>> {
    match ctx.sessions().fetch_all().await {
        Ok(sessions) => Ok(sessions),
        Err(e) => unexpected(e),
    }
}

/// Deletes every expired session, returning how many were removed.
pub async fn delete_expired<C: Context + ?Sized>(ctx: &C) -> ServiceResult<usize> {
    let timeout = ctx.session_timeout();
    let mut deleted = 0;
    for session in fetch_all(ctx).await? {
        if !session.is_expired(timeout) {
            continue;
        }
        info!(
            session_id = session.session_id.to_string(),
            user_id = session.user_id,
            "Session timed out..."
        );
        match ctx.sessions().delete(&session).await {
            Ok(()) => deleted += 1,
            Err(e) => error!(
                session_id = session.session_id.to_string(),
                user_id = session.user_id,
                "Failed to time out session: {e:?}",
            ),
        }
    }
    Ok(deleted)
}
