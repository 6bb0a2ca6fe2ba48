use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::models::{Category, Operation, User};

use super::{NewCategory, NewOperation, NewUser, OperationFilter, Store, StoreError};

/// Postgres-backed store. Cascades are enforced by `ON DELETE CASCADE`
/// in the schema, duplicate emails by the unique index on
/// `users.email`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            // Bounded wait so a wedged pool surfaces as an error instead
            // of hanging the request.
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;

        Ok(Self { pool })
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::DuplicateEmail,
            Some("23503") => return StoreError::ForeignKey,
            _ => {}
        }
    }
    StoreError::Backend(err.into())
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, email, password_hash, budget_limit, avatar
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, email, password_hash, budget_limit, avatar
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, surname, email, password_hash, budget_limit, avatar)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, surname, email, password_hash, budget_limit, avatar
            "#,
        )
        .bind(&new.name)
        .bind(&new.surname)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.budget_limit)
        .bind(&new.avatar)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $2, surname = $3, email = $4, password_hash = $5,
                budget_limit = $6, avatar = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.budget_limit)
        .bind(&user.avatar)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, color, category_type, owner_id
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_categories(&self, owner_id: i64) -> Result<Vec<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, color, category_type, owner_id
            FROM categories
            WHERE owner_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, color, category_type, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, color, category_type, owner_id
            "#,
        )
        .bind(&new.name)
        .bind(&new.color)
        .bind(&new.category_type)
        .bind(new.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, color = $3, category_type = $4
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.category_type)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_operation(&self, id: i64) -> Result<Option<Operation>, StoreError> {
        sqlx::query_as::<_, Operation>(
            r#"
            SELECT id, name, date, amount, category_id, owner_id
            FROM operations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_operations(
        &self,
        owner_id: i64,
        filter: &OperationFilter,
    ) -> Result<Vec<Operation>, StoreError> {
        // Inclusive bounds on both ends; id breaks date ties so the
        // order is stable across identical calls.
        sqlx::query_as::<_, Operation>(
            r#"
            SELECT id, name, date, amount, category_id, owner_id
            FROM operations
            WHERE owner_id = $1
              AND ($2::BIGINT IS NULL OR category_id = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR date >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR date <= $4)
            ORDER BY date DESC, id
            "#,
        )
        .bind(owner_id)
        .bind(filter.category_id)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_operation(&self, new: NewOperation) -> Result<Operation, StoreError> {
        sqlx::query_as::<_, Operation>(
            r#"
            INSERT INTO operations (name, date, amount, category_id, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, date, amount, category_id, owner_id
            "#,
        )
        .bind(&new.name)
        .bind(new.date)
        .bind(new.amount)
        .bind(new.category_id)
        .bind(new.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE operations
            SET name = $2, date = $3, amount = $4, category_id = $5
            WHERE id = $1
            "#,
        )
        .bind(operation.id)
        .bind(&operation.name)
        .bind(operation.date)
        .bind(operation.amount)
        .bind(operation.category_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete_operation(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM operations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
