use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{error::ApiError, state::AppState, store::NewUser};

use super::{
    dto::{LoginRequest, RegisterRequest, TokenResponse},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};

/// Verified against when login names an unknown email, so that path
/// costs the same as a real password check.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$VE0e3g7DalWHgDwou3nuRA$uC6TER156UQpk0lNQ5+jHM0l5poVjPA1he8TZbuGcKA";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!("invalid email supplied at registration");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < 6 || payload.password.len() > 255 {
        return Err(ApiError::Validation(
            "password must be between 6 and 255 characters".into(),
        ));
    }
    if payload.name.trim().len() < 2 || payload.surname.trim().len() < 2 {
        return Err(ApiError::Validation(
            "name and surname must be at least 2 characters".into(),
        ));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    // Argon2 is CPU-bound; keep it off the request-accepting threads.
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let user = state
        .store
        .create_user(NewUser {
            name: payload.name.trim().to_owned(),
            surname: payload.surname.trim().to_owned(),
            email,
            password_hash,
            budget_limit: payload.budget_limit,
            avatar: payload.avatar,
        })
        .await?;

    let token = JwtKeys::from_ref(&state).sign(&user.email)?;

    info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "user successfully registered".into(),
            user_id: user.id,
            access_token: token,
            token_type: "Bearer",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    // Run the hash comparison whether or not the email is known, and
    // collapse both failures into one response.
    let found = state.store.find_user_by_email(&email).await?;
    let stored_hash = found
        .as_ref()
        .map(|u| u.password_hash.clone())
        .unwrap_or_else(|| DUMMY_HASH.to_owned());

    let password = payload.password;
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    let user = match (ok, found) {
        (true, Some(user)) => user,
        _ => {
            warn!(%email, "login failed");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = JwtKeys::from_ref(&state).sign(&user.email)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(TokenResponse {
        message: "user signed in successfully".into(),
        user_id: user.id,
        access_token: token,
        token_type: "Bearer",
    }))
}
