use std::sync::Mutex;

use axum::async_trait;

use crate::models::{Category, Operation, User};

use super::{NewCategory, NewOperation, NewUser, OperationFilter, Store, StoreError};

/// In-memory store with the same contract as the Postgres one:
/// store-assigned ids, duplicate-email rejection, foreign-key rejection
/// and cascading deletes. A single mutex serializes access, which is
/// enough for test workloads.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    operations: Vec<Operation>,
    next_user_id: i64,
    next_category_id: i64,
    next_operation_id: i64,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // Mutex poisoning only happens after a panic in another test
        // thread; propagating the panic is fine there.
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            name: new.name,
            surname: new.surname,
            email: new.email,
            password_hash: new.password_hash,
            budget_limit: new.budget_limit,
            avatar: new.avatar,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables
            .users
            .iter()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(row) = tables.users.iter_mut().find(|u| u.id == user.id) {
            *row = user.clone();
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.users.retain(|u| u.id != id);
        tables.categories.retain(|c| c.owner_id != id);
        tables.operations.retain(|o| o.owner_id != id);
        Ok(())
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn list_categories(&self, owner_id: i64) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.lock();
        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            name: new.name,
            color: new.color,
            category_type: new.category_type,
            owner_id: new.owner_id,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if let Some(row) = tables.categories.iter_mut().find(|c| c.id == category.id) {
            *row = category.clone();
        }
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.categories.retain(|c| c.id != id);
        tables.operations.retain(|o| o.category_id != id);
        Ok(())
    }

    async fn find_operation(&self, id: i64) -> Result<Option<Operation>, StoreError> {
        Ok(self.lock().operations.iter().find(|o| o.id == id).cloned())
    }

    async fn list_operations(
        &self,
        owner_id: i64,
        filter: &OperationFilter,
    ) -> Result<Vec<Operation>, StoreError> {
        let mut rows: Vec<Operation> = self
            .lock()
            .operations
            .iter()
            .filter(|o| o.owner_id == owner_id)
            .filter(|o| filter.category_id.map_or(true, |id| o.category_id == id))
            .filter(|o| filter.start.map_or(true, |start| o.date >= start))
            .filter(|o| filter.end.map_or(true, |end| o.date <= end))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal dates.
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn create_operation(&self, new: NewOperation) -> Result<Operation, StoreError> {
        let mut tables = self.lock();
        if !tables.categories.iter().any(|c| c.id == new.category_id) {
            return Err(StoreError::ForeignKey);
        }
        tables.next_operation_id += 1;
        let operation = Operation {
            id: tables.next_operation_id,
            name: new.name,
            date: new.date,
            amount: new.amount,
            category_id: new.category_id,
            owner_id: new.owner_id,
        };
        tables.operations.push(operation.clone());
        Ok(operation)
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables
            .categories
            .iter()
            .any(|c| c.id == operation.category_id)
        {
            return Err(StoreError::ForeignKey);
        }
        if let Some(row) = tables.operations.iter_mut().find(|o| o.id == operation.id) {
            *row = operation.clone();
        }
        Ok(())
    }

    async fn delete_operation(&self, id: i64) -> Result<(), StoreError> {
        self.lock().operations.retain(|o| o.id != id);
        Ok(())
    }
}
