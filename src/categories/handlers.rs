use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::extractors::CurrentUser,
    error::ApiError,
    ownership::{check_author_param, check_category},
    state::AppState,
    store::NewCategory,
};

use super::dto::{
    CategoryCreateRequest, CategoryListQuery, CategoryResponse, CategoryUpdateRequest,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/category", get(list_categories).post(create_category))
        .route(
            "/category/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

#[instrument(skip(state, actor))]
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    check_author_param(query.author, &actor)?;
    let categories = state.store.list_categories(actor.id).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, actor))]
pub async fn get_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = check_category(state.store.find_category(id).await?, &actor)?;
    Ok(Json(category.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<CategoryCreateRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    if payload.name.trim().is_empty() || payload.category_type.trim().is_empty() {
        return Err(ApiError::Validation(
            "name and categoryType are required".into(),
        ));
    }

    let category = state
        .store
        .create_category(NewCategory {
            name: payload.name,
            color: payload.color,
            category_type: payload.category_type,
            owner_id: actor.id,
        })
        .await?;

    info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryUpdateRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let mut category = check_category(state.store.find_category(id).await?, &actor)?;

    if let Some(name) = payload.name {
        category.name = name;
    }
    if let Some(color) = payload.color {
        category.color = color;
    }
    if let Some(category_type) = payload.category_type {
        category.category_type = category_type;
    }

    state.store.update_category(&category).await?;
    Ok(Json(category.into()))
}

#[instrument(skip(state, actor))]
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    check_category(state.store.find_category(id).await?, &actor)?;
    // Cascades to every operation filed under this category.
    state.store.delete_category(id).await?;
    info!(category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
