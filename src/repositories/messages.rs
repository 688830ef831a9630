use crate::entities::messages::{CreateMessageArgs, Message};
use crate::models::messages::MessageTarget;
use chrono::{SubsecRound, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder};

const TABLE_NAME: &str = "chat_messages";
const READ_FIELDS: &str =
    "id, room_id, conversation_id, sender_id, content, `timestamp`, is_read, image";

pub async fn create(db: &MySqlPool, args: CreateMessageArgs) -> sqlx::Result<Message> {
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        " (room_id, conversation_id, sender_id, content, `timestamp`, is_read, image) ",
        "VALUES (?, ?, ?, ?, ?, FALSE, ?)"
    );
    let timestamp = Utc::now().trunc_subsecs(6);
    let result = sqlx::query(QUERY)
        .bind(args.room_id)
        .bind(args.conversation_id)
        .bind(args.sender_id)
        .bind(&args.content)
        .bind(timestamp)
        .bind(&args.image)
        .execute(db)
        .await?;
    Ok(Message {
        id: result.last_insert_id() as i64,
        room_id: args.room_id,
        conversation_id: args.conversation_id,
        sender_id: args.sender_id,
        content: args.content,
        timestamp,
        is_read: false,
        image: args.image,
    })
}

pub async fn fetch_for_target(db: &MySqlPool, target: MessageTarget) -> sqlx::Result<Vec<Message>> {
    const ORDER: &str = " ORDER BY `timestamp` ASC, id ASC";
    match target {
        MessageTarget::Room(room_id) => {
            const QUERY: &str = const_str::concat!(
                "SELECT ",
                READ_FIELDS,
                " FROM ",
                TABLE_NAME,
                " WHERE room_id = ?",
                ORDER
            );
            sqlx::query_as(QUERY).bind(room_id).fetch_all(db).await
        }
        MessageTarget::Conversation(conversation_id) => {
            const QUERY: &str = const_str::concat!(
                "SELECT ",
                READ_FIELDS,
                " FROM ",
                TABLE_NAME,
                " WHERE conversation_id = ?",
                ORDER
            );
            sqlx::query_as(QUERY)
                .bind(conversation_id)
                .fetch_all(db)
                .await
        }
    }
}

pub async fn fetch_latest(db: &MySqlPool, conversation_ids: &[i64]) -> sqlx::Result<Vec<Message>> {
    if conversation_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut query = QueryBuilder::<MySql>::new(const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id IN (SELECT MAX(id) FROM ",
        TABLE_NAME,
        " WHERE conversation_id IN ("
    ));
    let mut ids = query.separated(", ");
    for conversation_id in conversation_ids {
        ids.push_bind(*conversation_id);
    }
    ids.push_unseparated(") GROUP BY conversation_id)");
    query.build_query_as().fetch_all(db).await
}

pub async fn count_unread(db: &MySqlPool, user_id: i64) -> sqlx::Result<Vec<(i64, i64)>> {
    const QUERY: &str = const_str::concat!(
        "SELECT m.conversation_id, COUNT(*) FROM ",
        TABLE_NAME,
        " m INNER JOIN chat_conversations c ON c.id = m.conversation_id ",
        "WHERE (c.participant1_id = ? OR c.participant2_id = ?) ",
        "AND m.sender_id <> ? AND m.is_read = FALSE ",
        "GROUP BY m.conversation_id"
    );
    sqlx::query_as(QUERY)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db)
        .await
}

pub async fn mark_read(db: &MySqlPool, conversation_id: i64, reader_id: i64) -> sqlx::Result<u64> {
    const QUERY: &str = const_str::concat!(
        "UPDATE ",
        TABLE_NAME,
        " SET is_read = TRUE ",
        "WHERE conversation_id = ? AND sender_id <> ? AND is_read = FALSE"
    );
    let result = sqlx::query(QUERY)
        .bind(conversation_id)
        .bind(reader_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_delivered(
    db: &MySqlPool,
    message_id: i64,
    target: MessageTarget,
    recipient_id: i64,
) -> sqlx::Result<bool> {
    let query = match target {
        MessageTarget::Room(room_id) => {
            const QUERY: &str = const_str::concat!(
                "DELETE FROM ",
                TABLE_NAME,
                " WHERE id = ? AND room_id = ? AND sender_id <> ?"
            );
            sqlx::query(QUERY).bind(message_id).bind(room_id)
        }
        MessageTarget::Conversation(conversation_id) => {
            const QUERY: &str = const_str::concat!(
                "DELETE FROM ",
                TABLE_NAME,
                " WHERE id = ? AND conversation_id = ? AND sender_id <> ?"
            );
            sqlx::query(QUERY).bind(message_id).bind(conversation_id)
        }
    };
    let result = query.bind(recipient_id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
