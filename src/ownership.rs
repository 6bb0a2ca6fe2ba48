//! Ownership checks applied before every scoped read or write.
//!
//! The order is fixed: a resource that does not exist is a 404 before
//! any ownership comparison runs; an existing resource owned by someone
//! else is a 403. Handlers go through these helpers rather than
//! comparing ids inline.

use crate::error::ApiError;
use crate::models::{Category, Operation, User};

/// Admits `actor` to `category`, or explains why not.
pub fn check_category(category: Option<Category>, actor: &User) -> Result<Category, ApiError> {
    let category = category.ok_or(ApiError::NotFound("category"))?;
    if category.owner_id != actor.id {
        return Err(ApiError::Forbidden("cannot access another user's category"));
    }
    Ok(category)
}

/// Admits `actor` to `operation`, or explains why not. The owner id is
/// stored on the operation itself, so no category lookup is needed.
pub fn check_operation(operation: Option<Operation>, actor: &User) -> Result<Operation, ApiError> {
    let operation = operation.ok_or(ApiError::NotFound("operation"))?;
    if operation.owner_id != actor.id {
        return Err(ApiError::Forbidden(
            "cannot access another user's operation",
        ));
    }
    Ok(operation)
}

/// Guard for the `author` listing override: callers may only ask for
/// their own data.
pub fn check_author_param(author: Option<i64>, actor: &User) -> Result<(), ApiError> {
    match author {
        Some(id) if id != actor.id => {
            Err(ApiError::Forbidden("cannot list another user's data"))
        }
        _ => Ok(()),
    }
}
