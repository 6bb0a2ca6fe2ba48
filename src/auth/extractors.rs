use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{error::ApiError, models::User, state::AppState};

use super::jwt::JwtKeys;

/// Bearer-token verifier. Yields the claimed email and nothing else;
/// whether that account still exists is [`CurrentUser`]'s problem.
#[derive(Debug)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthenticated)?;
        let claims = keys.verify(token)?;
        Ok(AuthUser(claims.sub))
    }
}

/// Resolves the verified claim to a live user record. A valid token for
/// a deleted account fails here with a 404; stateless tokens are not
/// revoked by deletion.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(email) = AuthUser::from_request_parts(parts, state).await?;
        let user = state
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        Ok(CurrentUser(user))
    }
}
