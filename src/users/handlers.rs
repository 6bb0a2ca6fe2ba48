use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::CurrentUser, handlers::is_valid_email, password::hash_password},
    error::ApiError,
    state::AppState,
};

use super::dto::{AvatarUpdateRequest, BudgetUpdateRequest, UserResponse, UserUpdateRequest};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(get_me))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/user/:id/budget", patch(update_budget))
        .route("/user/:id/avatar", patch(update_avatar))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(mut actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if actor.id != id {
        return Err(ApiError::Forbidden("cannot update another user's data"));
    }

    if let Some(name) = payload.name {
        actor.name = name;
    }
    if let Some(surname) = payload.surname {
        actor.surname = surname;
    }
    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
        if let Some(other) = state.store.find_user_by_email(&email).await? {
            if other.id != actor.id {
                warn!(%email, "email already in use");
                return Err(ApiError::DuplicateEmail);
            }
        }
        actor.email = email;
    }
    if let Some(password) = payload.password {
        if password.len() < 6 || password.len() > 255 {
            return Err(ApiError::Validation(
                "password must be between 6 and 255 characters".into(),
            ));
        }
        actor.password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ApiError::Internal(e.into()))??;
    }
    if let Some(budget_limit) = payload.budget_limit {
        actor.budget_limit = budget_limit;
    }
    if let Some(avatar) = payload.avatar {
        actor.avatar = Some(avatar);
    }

    state.store.update_user(&actor).await?;
    info!(user_id = actor.id, "user updated");
    Ok(Json(actor.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_budget(
    State(state): State<AppState>,
    CurrentUser(mut actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<BudgetUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if actor.id != id {
        return Err(ApiError::Forbidden("cannot update another user's budget"));
    }
    actor.budget_limit = payload.budget_limit;
    state.store.update_user(&actor).await?;
    Ok(Json(actor.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(mut actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AvatarUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if actor.id != id {
        return Err(ApiError::Forbidden("cannot update another user's avatar"));
    }
    actor.avatar = Some(payload.avatar);
    state.store.update_user(&actor).await?;
    Ok(Json(actor.into()))
}

/// Deleting an account cascades to every owned category and operation.
/// Outstanding tokens stay verifiable but fail identity resolution from
/// this point on.
#[instrument(skip(state, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if actor.id != id {
        return Err(ApiError::Forbidden("cannot delete another user"));
    }
    state.store.delete_user(id).await?;
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
