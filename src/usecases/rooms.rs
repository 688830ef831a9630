use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::entities::chat_rooms::ChatRoom;
use crate::entities::sessions::Session;
use crate::repositories::StoreError;

/// A legacy room is open to its user and to the owner of its brand.
pub async fn authorize<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    room_id: i64,
) -> ServiceResult<ChatRoom> {
    let room = match ctx.store().fetch_room(room_id).await {
        Ok(room) => room,
        Err(StoreError::NotFound) => return Err(AppError::RoomsNotFound),
        Err(e) => return unexpected(e),
    };
    if room.user_id == session.user_id {
        return Ok(room);
    }
    match ctx.store().fetch_brand(room.brand_id).await {
        Ok(brand) if brand.owner_id == session.user_id => Ok(room),
        Ok(_) | Err(StoreError::NotFound) => Err(AppError::RoomsForbidden),
        Err(e) => unexpected(e),
    }
}
