use crate::entities::conversations::{Conversation, ConversationKey};
use crate::models::conversations::ConversationFilter;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::MySqlPool;

const TABLE_NAME: &str = "chat_conversations";
const READ_FIELDS: &str =
    "id, brand_id, participant1_id, participant2_id, created_at, updated_at";

pub async fn fetch_one(db: &MySqlPool, conversation_id: i64) -> sqlx::Result<Conversation> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id = ?"
    );
    sqlx::query_as(QUERY)
        .bind(conversation_id)
        .fetch_one(db)
        .await
}

/// `brand_key` is the generated `COALESCE(brand_id, 0)` column backing the
/// unique index, so brand-less conversations are matched as well.
pub async fn fetch_one_by_key(
    db: &MySqlPool,
    key: ConversationKey,
) -> sqlx::Result<Option<Conversation>> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE participant1_id = ? AND participant2_id = ? AND brand_key = ?"
    );
    sqlx::query_as(QUERY)
        .bind(key.participant1_id)
        .bind(key.participant2_id)
        .bind(key.brand_id.unwrap_or(0))
        .fetch_optional(db)
        .await
}

pub async fn create(db: &MySqlPool, key: ConversationKey) -> sqlx::Result<Conversation> {
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        " (brand_id, participant1_id, participant2_id, created_at, updated_at) ",
        "VALUES (?, ?, ?, ?, ?)"
    );
    let now = Utc::now().trunc_subsecs(6);
    let result = sqlx::query(QUERY)
        .bind(key.brand_id)
        .bind(key.participant1_id)
        .bind(key.participant2_id)
        .bind(now)
        .bind(now)
        .execute(db)
        .await?;
    Ok(Conversation {
        id: result.last_insert_id() as i64,
        brand_id: key.brand_id,
        participant1_id: key.participant1_id,
        participant2_id: key.participant2_id,
        created_at: now,
        updated_at: now,
    })
}

pub async fn fetch_for_user(
    db: &MySqlPool,
    user_id: i64,
    filter: ConversationFilter,
) -> sqlx::Result<Vec<Conversation>> {
    const ORDER: &str = " ORDER BY updated_at DESC, id DESC";
    match filter {
        ConversationFilter::All => {
            const QUERY: &str = const_str::concat!(
                "SELECT ",
                READ_FIELDS,
                " FROM ",
                TABLE_NAME,
                " WHERE participant1_id = ? OR participant2_id = ?",
                ORDER
            );
            sqlx::query_as(QUERY)
                .bind(user_id)
                .bind(user_id)
                .fetch_all(db)
                .await
        }
        ConversationFilter::Creators => {
            const QUERY: &str = const_str::concat!(
                "SELECT ",
                READ_FIELDS,
                " FROM ",
                TABLE_NAME,
                " WHERE (participant1_id = ? OR participant2_id = ?) AND brand_id IS NULL",
                ORDER
            );
            sqlx::query_as(QUERY)
                .bind(user_id)
                .bind(user_id)
                .fetch_all(db)
                .await
        }
        ConversationFilter::Brands => {
            const QUERY: &str = const_str::concat!(
                "SELECT ",
                READ_FIELDS,
                " FROM ",
                TABLE_NAME,
                " WHERE brand_id IN (SELECT id FROM brands WHERE owner_id = ?)",
                ORDER
            );
            sqlx::query_as(QUERY).bind(user_id).fetch_all(db).await
        }
    }
}

pub async fn touch(db: &MySqlPool, conversation_id: i64, at: DateTime<Utc>) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!("UPDATE ", TABLE_NAME, " SET updated_at = ? WHERE id = ?");
    sqlx::query(QUERY)
        .bind(at)
        .bind(conversation_id)
        .execute(db)
        .await?;
    Ok(())
}
