use crate::entities::users::User;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const TABLE_NAME: &str = "users";
const READ_FIELDS: &str = "id, username, email, password_hash, is_staff, is_active, profile_image";

pub async fn fetch_one(db: &MySqlPool, user_id: i64) -> sqlx::Result<User> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id = ?"
    );
    sqlx::query_as(QUERY).bind(user_id).fetch_one(db).await
}

pub async fn fetch_many(db: &MySqlPool, user_ids: &[i64]) -> sqlx::Result<Vec<User>> {
    if user_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut query = QueryBuilder::<MySql>::new(const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id IN ("
    ));
    let mut ids = query.separated(", ");
    for user_id in user_ids {
        ids.push_bind(*user_id);
    }
    ids.push_unseparated(")");
    query.build_query_as().fetch_all(db).await
}

pub async fn fetch_one_by_username(db: &MySqlPool, username: &str) -> sqlx::Result<User> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE username = ?"
    );
    sqlx::query_as(QUERY).bind(username).fetch_one(db).await
}

pub async fn fetch_one_by_email(db: &MySqlPool, email: &str) -> sqlx::Result<User> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE LOWER(email) = LOWER(?) LIMIT 1"
    );
    sqlx::query_as(QUERY).bind(email).fetch_one(db).await
}
