use crate::entities::chat_rooms::ChatRoom;
use sqlx::MySqlPool;

const TABLE_NAME: &str = "chat_rooms";
const READ_FIELDS: &str = "id, brand_id, user_id, created_at";

pub async fn fetch_one(db: &MySqlPool, room_id: i64) -> sqlx::Result<ChatRoom> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id = ?"
    );
    sqlx::query_as(QUERY).bind(room_id).fetch_one(db).await
}
