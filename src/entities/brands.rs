#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub organization_id: Option<i64>,
    pub logo: Option<String>,
}
