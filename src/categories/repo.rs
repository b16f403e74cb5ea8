use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    categories::repo_types::{Category, CategoryPatch, NewCategory},
    web::ListFilter,
};

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Category>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Category>>;
    async fn create(&self, input: NewCategory) -> anyhow::Result<Category>;
    async fn update(&self, id: Uuid, patch: CategoryPatch) -> anyhow::Result<Option<Category>>;
    /// Returns the deleted record, if there was one.
    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Category>>;
}

#[derive(Clone)]
pub struct PgCategoryStore {
    db: PgPool,
}

impl PgCategoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn list_query(filter: &ListFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb =
        QueryBuilder::<Postgres>::new("SELECT id, name, description FROM categories WHERE TRUE");
    if let Some(pattern) = filter.like_pattern() {
        qb.push(" AND name ILIKE ").push_bind(pattern);
    }
    qb.push(" ORDER BY ")
        .push(filter.sort.order_expr(""))
        .push(" ")
        .push(filter.direction.keyword())
        .push(", id");
    qb
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Category>> {
        let mut qb = list_query(filter);
        qb.build_query_as::<Category>()
            .fetch_all(&self.db)
            .await
            .context("list categories")
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Category>> {
        sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get category")
    }

    async fn create(&self, input: NewCategory) -> anyhow::Result<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(input.name)
        .bind(input.description)
        .fetch_one(&self.db)
        .await
        .context("insert category")
    }

    async fn update(&self, id: Uuid, patch: CategoryPatch) -> anyhow::Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description)
             WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .fetch_optional(&self.db)
        .await
        .context("update category")
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "DELETE FROM categories WHERE id = $1 RETURNING id, name, description",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("delete category")
    }
}
