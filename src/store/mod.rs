//! Storage interface for users, categories and operations.
//!
//! Handlers, the ownership checks and the operation listing are written
//! against the [`Store`] trait only. [`postgres::PgStore`] backs the
//! running server, [`memory::MemStore`] backs the tests.

use axum::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::{Category, Operation, User};

mod memory;
mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already in use")]
    DuplicateEmail,
    #[error("referenced row does not exist")]
    ForeignKey,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub budget_limit: f64,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub category_type: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewOperation {
    pub name: String,
    pub date: OffsetDateTime,
    pub amount: f64,
    pub category_id: i64,
    pub owner_id: i64,
}

/// Filter for the operation listing. The owner scope is a separate,
/// mandatory argument; these bounds only narrow it. Both time bounds are
/// UTC and inclusive.
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    pub category_id: Option<i64>,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Rejects a taken email with [`StoreError::DuplicateEmail`].
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    /// Full-row update keyed by `user.id`. Same duplicate-email rule as
    /// [`Store::create_user`].
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    /// Deletes the user and cascades to all owned categories and
    /// operations.
    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;

    async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError>;
    async fn list_categories(&self, owner_id: i64) -> Result<Vec<Category>, StoreError>;
    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError>;
    async fn update_category(&self, category: &Category) -> Result<(), StoreError>;
    /// Deletes the category and cascades to its operations.
    async fn delete_category(&self, id: i64) -> Result<(), StoreError>;

    async fn find_operation(&self, id: i64) -> Result<Option<Operation>, StoreError>;
    /// Operations for `owner_id` matching `filter`, date-descending,
    /// ties in insertion order.
    async fn list_operations(
        &self,
        owner_id: i64,
        filter: &OperationFilter,
    ) -> Result<Vec<Operation>, StoreError>;
    /// Fails with [`StoreError::ForeignKey`] if the category was deleted
    /// concurrently, so an orphan operation is never written.
    async fn create_operation(&self, new: NewOperation) -> Result<Operation, StoreError>;
    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError>;
    async fn delete_operation(&self, id: i64) -> Result<(), StoreError>;
}
