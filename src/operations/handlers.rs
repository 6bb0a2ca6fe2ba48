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
    ownership::{check_author_param, check_category, check_operation},
    state::AppState,
    store::{NewOperation, OperationFilter},
};

use super::dto::{
    parse_utc, OperationCreateRequest, OperationListQuery, OperationResponse,
    OperationUpdateRequest,
};

pub fn operation_routes() -> Router<AppState> {
    Router::new()
        .route("/operation", get(list_operations).post(create_operation))
        .route(
            "/operation/:id",
            get(get_operation)
                .put(update_operation)
                .delete(delete_operation),
        )
}

#[instrument(skip(state, actor))]
pub async fn list_operations(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<OperationListQuery>,
) -> Result<Json<Vec<OperationResponse>>, ApiError> {
    check_author_param(query.author, &actor)?;

    let filter = OperationFilter {
        category_id: query.category_id,
        start: query.start_time.as_deref().map(parse_utc).transpose()?,
        end: query.end_time.as_deref().map(parse_utc).transpose()?,
    };
    let operations = state.store.list_operations(actor.id, &filter).await?;
    Ok(Json(operations.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, actor))]
pub async fn get_operation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<OperationResponse>, ApiError> {
    let operation = check_operation(state.store.find_operation(id).await?, &actor)?;
    Ok(Json(operation.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn create_operation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<OperationCreateRequest>,
) -> Result<(StatusCode, Json<OperationResponse>), ApiError> {
    // The target category must exist and belong to the actor before
    // anything is written. If it is deleted concurrently, the insert
    // fails on the foreign key rather than orphaning the operation.
    check_category(state.store.find_category(payload.category_id).await?, &actor)?;

    let operation = state
        .store
        .create_operation(NewOperation {
            name: payload.name,
            date: parse_utc(&payload.date)?,
            amount: payload.amount,
            category_id: payload.category_id,
            owner_id: actor.id,
        })
        .await?;

    info!(operation_id = operation.id, "operation created");
    Ok((StatusCode::CREATED, Json(operation.into())))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_operation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<OperationUpdateRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let mut operation = check_operation(state.store.find_operation(id).await?, &actor)?;

    if let Some(category_id) = payload.category_id {
        // Re-pointing the operation needs the same guard as creation.
        check_category(state.store.find_category(category_id).await?, &actor)?;
        operation.category_id = category_id;
    }
    if let Some(name) = payload.name {
        operation.name = name;
    }
    if let Some(date) = payload.date {
        operation.date = parse_utc(&date)?;
    }
    if let Some(amount) = payload.amount {
        operation.amount = amount;
    }

    state.store.update_operation(&operation).await?;
    Ok(Json(operation.into()))
}

#[instrument(skip(state, actor))]
pub async fn delete_operation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    check_operation(state.store.find_operation(id).await?, &actor)?;
    state.store.delete_operation(id).await?;
    info!(operation_id = id, "operation deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::models::User;
    use crate::store::{NewCategory, NewUser};

    use super::*;

    async fn seeded_user(state: &AppState, email: &str) -> User {
        state
            .store
            .create_user(NewUser {
                name: "Test".into(),
                surname: "User".into(),
                email: email.into(),
                password_hash: "hash".into(),
                budget_limit: 0.0,
                avatar: None,
            })
            .await
            .unwrap()
    }

    async fn seeded_category(state: &AppState, owner_id: i64) -> i64 {
        state
            .store
            .create_category(NewCategory {
                name: "Salary".into(),
                color: "#ffffff".into(),
                category_type: "income".into(),
                owner_id,
            })
            .await
            .unwrap()
            .id
    }

    fn paycheck(category_id: i64, date: &str) -> OperationCreateRequest {
        OperationCreateRequest {
            name: "Paycheck".into(),
            date: date.into(),
            amount: 1000.0,
            category_id,
        }
    }

    #[tokio::test]
    async fn register_category_operation_list_scenario() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let category_id = seeded_category(&state, a.id).await;

        let (status, Json(created)) = create_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Json(paycheck(category_id, "2024-12-25T00:00:00Z")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(listed) = list_operations(
            State(state.clone()),
            CurrentUser(a.clone()),
            Query(OperationListQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        let only = &listed[0];
        assert_eq!(only.id, created.id);
        assert_eq!(only.name, "Paycheck");
        assert_eq!(only.amount, 1000.0);
        assert_eq!(only.category_id, category_id);
        assert_eq!(only.owner_id, a.id);
    }

    #[tokio::test]
    async fn operation_in_another_users_category_is_forbidden() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let b = seeded_user(&state, "b@x.com").await;
        let owned_by_b = seeded_category(&state, b.id).await;

        let err = create_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Json(paycheck(owned_by_b, "2024-12-25T00:00:00Z")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // Same guard on reassignment.
        let own_category = seeded_category(&state, a.id).await;
        let (_, Json(created)) = create_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Json(paycheck(own_category, "2024-12-25T00:00:00Z")),
        )
        .await
        .unwrap();
        let err = update_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Path(created.id),
            Json(OperationUpdateRequest {
                name: None,
                date: None,
                amount: None,
                category_id: Some(owned_by_b),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cross_tenant_operation_access_is_forbidden_and_unchanged() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let b = seeded_user(&state, "b@x.com").await;
        let category_b = seeded_category(&state, b.id).await;
        let (_, Json(owned_by_b)) = create_operation(
            State(state.clone()),
            CurrentUser(b.clone()),
            Json(paycheck(category_b, "2024-12-25T00:00:00Z")),
        )
        .await
        .unwrap();

        let err = get_operation(State(state.clone()), CurrentUser(a.clone()), Path(owned_by_b.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = update_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Path(owned_by_b.id),
            Json(OperationUpdateRequest {
                name: Some("Hijacked".into()),
                date: None,
                amount: None,
                category_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = delete_operation(State(state.clone()), CurrentUser(a), Path(owned_by_b.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let unchanged = state
            .store
            .find_operation(owned_by_b.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.name, "Paycheck");
        assert_eq!(unchanged.owner_id, b.id);
    }

    #[tokio::test]
    async fn missing_operation_is_not_found_before_ownership() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let err = get_operation(State(state), CurrentUser(a), Path(42))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("operation")));
    }

    #[tokio::test]
    async fn date_filter_is_inclusive_and_normalizes_offsets() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let category_id = seeded_category(&state, a.id).await;

        for date in [
            "2024-12-01T23:59:59Z", // one second before the bound
            "2024-12-02T00:00:00Z", // exactly on the bound
            "2024-12-03T00:00:00Z",
        ] {
            create_operation(
                State(state.clone()),
                CurrentUser(a.clone()),
                Json(paycheck(category_id, date)),
            )
            .await
            .unwrap();
        }

        // The bound is given in +03:00; it equals 2024-12-02T00:00:00Z.
        let Json(listed) = list_operations(
            State(state.clone()),
            CurrentUser(a.clone()),
            Query(OperationListQuery {
                start_time: Some("2024-12-02T03:00:00+03:00".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].date, datetime!(2024-12-03 00:00 UTC));
        assert_eq!(listed[1].date, datetime!(2024-12-02 00:00 UTC));
    }

    #[tokio::test]
    async fn listing_is_idempotent_without_writes() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let category_id = seeded_category(&state, a.id).await;
        for date in ["2024-12-01", "2024-12-02", "2024-12-02", "2024-12-03"] {
            create_operation(
                State(state.clone()),
                CurrentUser(a.clone()),
                Json(paycheck(category_id, date)),
            )
            .await
            .unwrap();
        }

        let query = || {
            list_operations(
                State(state.clone()),
                CurrentUser(a.clone()),
                Query(OperationListQuery::default()),
            )
        };
        let Json(first) = query().await.unwrap();
        let Json(second) = query().await.unwrap();
        let ids = |rows: &[OperationResponse]| rows.iter().map(|o| o.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn category_filter_narrows_the_listing() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let salary = seeded_category(&state, a.id).await;
        let groceries = seeded_category(&state, a.id).await;
        create_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Json(paycheck(salary, "2024-12-01")),
        )
        .await
        .unwrap();
        create_operation(
            State(state.clone()),
            CurrentUser(a.clone()),
            Json(paycheck(groceries, "2024-12-02")),
        )
        .await
        .unwrap();

        let Json(listed) = list_operations(
            State(state.clone()),
            CurrentUser(a.clone()),
            Query(OperationListQuery {
                category_id: Some(salary),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].category_id, salary);
    }

    #[tokio::test]
    async fn author_override_must_name_the_actor() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let b = seeded_user(&state, "b@x.com").await;

        let err = list_operations(
            State(state.clone()),
            CurrentUser(a.clone()),
            Query(OperationListQuery {
                author: Some(b.id),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // Naming yourself is allowed.
        list_operations(
            State(state),
            CurrentUser(a.clone()),
            Query(OperationListQuery {
                author: Some(a.id),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn bad_time_bound_is_a_validation_error() {
        let state = AppState::fake();
        let a = seeded_user(&state, "a@x.com").await;
        let err = list_operations(
            State(state),
            CurrentUser(a),
            Query(OperationListQuery {
                start_time: Some("yesterday".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
