use serde::{Deserialize, Serialize};

use crate::models::Category;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreateRequest {
    pub name: String,
    pub color: String,
    pub category_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdateRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub category_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub author: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub category_type: String,
    pub owner_id: i64,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            color: category.color,
            category_type: category.category_type,
            owner_id: category.owner_id,
        }
    }
}
