use crate::entities::brands::Brand;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const TABLE_NAME: &str = "brands";
const READ_FIELDS: &str = "id, name, owner_id, organization_id, logo";

pub async fn fetch_one(db: &MySqlPool, brand_id: i64) -> sqlx::Result<Brand> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id = ?"
    );
    sqlx::query_as(QUERY).bind(brand_id).fetch_one(db).await
}

pub async fn fetch_many(db: &MySqlPool, brand_ids: &[i64]) -> sqlx::Result<Vec<Brand>> {
    if brand_ids.is_empty() {
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
    for brand_id in brand_ids {
        ids.push_bind(*brand_id);
    }
    ids.push_unseparated(")");
    query.build_query_as().fetch_all(db).await
}
