use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};

use crate::domain::entity::{NewProduct, Product};
use crate::domain::repository::ProductRepository;

pub struct ProductPostgresRepository {
    pool: PgPool,
}

impl ProductPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for ProductPostgresRepository {
    async fn upsert_batch(&self, products: &[NewProduct]) -> anyhow::Result<()> {
        if products.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let mut qb: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO catalog.products (sku, name, description, active) ");
        qb.push_values(products, |mut b, p| {
            b.push_bind(&p.sku)
                .push_bind(&p.name)
                .push_bind(p.description.as_deref())
                .push_bind(p.active);
        });
        // 既存行の sku の表記、id、created_at は変更しない
        qb.push(
            r#" ON CONFLICT ((lower(sku))) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                active = EXCLUDED.active,
                updated_at = NOW()"#,
        );
        let result = qb.build().execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::debug!(
            rows = products.len(),
            affected = result.rows_affected(),
            "product batch upserted"
        );
        Ok(())
    }

    async fn find_by_sku(&self, sku: &str) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"SELECT id, sku, name, description, active, created_at, updated_at
               FROM catalog.products WHERE lower(sku) = lower($1)"#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
