use sqlx::FromRow;
use time::OffsetDateTime;

/// User record. `password_hash` never leaves this layer; response DTOs
/// carry only the public fields.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub budget_limit: f64,
    pub avatar: Option<String>,
}

/// Transaction category. `owner_id` is immutable after creation.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub category_type: String,
    pub owner_id: i64,
}

/// Financial operation. `owner_id` is copied from the actor at creation
/// and must match the owner of `category_id`; ownership checks compare
/// it directly, without a join.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Operation {
    pub id: i64,
    pub name: String,
    pub date: OffsetDateTime,
    pub amount: f64,
    pub category_id: i64,
    pub owner_id: i64,
}
