use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    products::repo_types::{NewProduct, Product, ProductPatch, ProductRow},
    web::ListFilter,
};

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Product>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    async fn create(&self, input: NewProduct) -> anyhow::Result<Product>;
    async fn update(&self, id: Uuid, patch: ProductPatch) -> anyhow::Result<Option<Product>>;
    /// Returns the deleted record, if there was one.
    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
}

/// Columns of `p` (products) populated with `c` (categories).
const POPULATED: &str = r#"
    SELECT p.id, p.name, p.price, p.image, p.description, p.category_id,
           c.name AS category_name, c.description AS category_description,
           p.created_at, p.updated_at
      FROM p
      LEFT JOIN categories c ON c.id = p.category_id
"#;

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Wraps a data-modifying statement in a CTE named `p` and populates its rows.
fn populated(cte: &str) -> String {
    format!("WITH p AS ({cte}) {POPULATED}")
}

fn list_query(filter: &ListFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(populated("SELECT * FROM products"));
    qb.push(" WHERE TRUE");
    if let Some(pattern) = filter.like_pattern() {
        qb.push(" AND p.name ILIKE ").push_bind(pattern);
    }
    if let Some(category) = filter.category {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    qb.push(" ORDER BY ")
        .push(filter.sort.order_expr("p."))
        .push(" ")
        .push(filter.direction.keyword())
        .push(", p.id");
    qb
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Product>> {
        let mut qb = list_query(filter);
        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.db)
            .await
            .context("list products")?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let sql = populated("SELECT * FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get product")?;
        Ok(row.map(Product::from))
    }

    async fn create(&self, input: NewProduct) -> anyhow::Result<Product> {
        let sql = populated(
            r#"
            INSERT INTO products (name, price, image, category_id, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(input.name)
            .bind(input.price)
            .bind(input.image)
            .bind(input.category)
            .bind(input.description)
            .fetch_one(&self.db)
            .await
            .context("insert product")?;
        Ok(row.into())
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> anyhow::Result<Option<Product>> {
        let sql = populated(
            r#"
            UPDATE products
               SET name = COALESCE($2, name),
                   price = COALESCE($3, price),
                   image = COALESCE($4, image),
                   category_id = COALESCE($5, category_id),
                   description = COALESCE($6, description),
                   updated_at = now()
             WHERE id = $1
            RETURNING *
            "#,
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.price)
            .bind(patch.image)
            .bind(patch.category)
            .bind(patch.description)
            .fetch_optional(&self.db)
            .await
            .context("update product")?;
        Ok(row.map(Product::from))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let sql = populated("DELETE FROM products WHERE id = $1 RETURNING *");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("delete product")?;
        Ok(row.map(Product::from))
    }
}
