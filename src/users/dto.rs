use serde::{Deserialize, Serialize};

use crate::models::User;

/// Public view of a user; the password hash never appears here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub budget_limit: f64,
    pub avatar: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            surname: user.surname,
            email: user.email,
            budget_limit: user.budget_limit,
            avatar: user.avatar,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub budget_limit: Option<f64>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdateRequest {
    pub budget_limit: f64,
}

#[derive(Debug, Deserialize)]
pub struct AvatarUpdateRequest {
    pub avatar: String,
}
