use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::categories::repo_types::Category;

/// Product with its category populated. A reference to a category that no
/// longer exists populates as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        // LEFT JOIN: a name is present only when the category row exists.
        let category = match (r.category_id, r.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id,
                name,
                description: r.category_description,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            name: r.name,
            price: r.price,
            image: r.image,
            category,
            description: r.description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub category: Option<Uuid>,
    pub description: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category: Option<Uuid>,
    pub description: Option<String>,
}
