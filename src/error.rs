use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Request-level error taxonomy. Every variant is terminal for the
/// request; nothing here is retried server-side.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential, or one that is not a Bearer header.
    #[error("sign in for access")]
    Unauthenticated,
    /// Login failure. Deliberately identical for an unknown email and a
    /// wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Token past its validity window. Surfaced distinctly so the client
    /// knows to re-authenticate.
    #[error("token expired")]
    Expired,
    /// Signature or structural failure. The message never says which.
    #[error("invalid token")]
    InvalidToken,
    /// The token verified but the account behind it is gone.
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} with supplied ID does not exist")]
    NotFound(&'static str),
    #[error("user with supplied email already exists")]
    DuplicateEmail,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Expired | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidToken | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(err) = &self {
            error!(error = %err, "internal error");
            // The cause stays in the log, not in the response body.
            return (status, Json(json!({ "detail": "internal server error" }))).into_response();
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            // A referenced category vanished between the ownership check
            // and the write; the insert failed cleanly instead of
            // orphaning the row.
            StoreError::ForeignKey => ApiError::NotFound("category"),
            StoreError::Backend(err) => ApiError::Internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_contract() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Expired.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden("nope").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("category").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::DuplicateEmail.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_errors_map_onto_api_errors() {
        assert!(matches!(
            ApiError::from(StoreError::DuplicateEmail),
            ApiError::DuplicateEmail
        ));
        assert!(matches!(
            ApiError::from(StoreError::ForeignKey),
            ApiError::NotFound("category")
        ));
    }
}
