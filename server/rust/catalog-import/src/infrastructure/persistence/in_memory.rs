use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::product::sku_key;
use crate::domain::entity::{ImportJob, ImportJobPatch, NewProduct, Product};
use crate::domain::repository::{ImportJobRepository, ProductRepository};

/// products.sku の列長。
pub const MAX_SKU_LEN: usize = 64;
/// products.name の列長。
pub const MAX_NAME_LEN: usize = 255;

/// InMemoryImportJobRepository はデータベース未設定時に使うジョブストア。
#[derive(Default)]
pub struct InMemoryImportJobRepository {
    jobs: RwLock<HashMap<Uuid, ImportJob>>,
}

impl InMemoryImportJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 格納されている全ジョブを作成順で返す。
    pub async fn all(&self) -> Vec<ImportJob> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<ImportJob> = jobs.values().cloned().collect();
        all.sort_by_key(|j| j.created_at);
        all
    }
}

#[async_trait]
impl ImportJobRepository for InMemoryImportJobRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn create(&self, job: &ImportJob) -> anyhow::Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            anyhow::bail!("import job already exists: {}", job.id);
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update(&self, id: Uuid, patch: &ImportJobPatch) -> anyhow::Result<Option<ImportJob>> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.apply(patch)?;
        Ok(Some(job.clone()))
    }
}

#[derive(Default)]
struct Catalog {
    by_key: HashMap<String, Product>,
    next_id: i64,
}

/// 列長制限を検査する。マージが失敗し得るのはここだけ。
fn check_limits(record: &NewProduct) -> anyhow::Result<()> {
    if record.sku.chars().count() > MAX_SKU_LEN {
        anyhow::bail!("sku exceeds {} characters: {}", MAX_SKU_LEN, record.sku);
    }
    if record.name.chars().count() > MAX_NAME_LEN {
        anyhow::bail!("name exceeds {} characters for sku {}", MAX_NAME_LEN, record.sku);
    }
    Ok(())
}

impl Catalog {
    /// 検査済みのレコードを取り込む。
    fn merge(&mut self, record: &NewProduct) {
        let now = Utc::now();
        match self.by_key.get_mut(&record.sku_key()) {
            Some(existing) => {
                existing.name.clone_from(&record.name);
                existing.description.clone_from(&record.description);
                existing.active = record.active;
                existing.updated_at = now;
            }
            None => {
                self.next_id += 1;
                self.by_key.insert(
                    record.sku_key(),
                    Product {
                        id: self.next_id,
                        sku: record.sku.clone(),
                        name: record.name.clone(),
                        description: record.description.clone(),
                        active: record.active,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
    }
}

/// InMemoryProductRepository はデータベース未設定時に使う商品カタログ。
/// バッチは全件の検査に通った場合にのみ書き込みロック下でその場に適用する。
#[derive(Default)]
pub struct InMemoryProductRepository {
    catalog: RwLock<Catalog>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 格納されている全商品を id 順で返す。
    pub async fn all(&self) -> Vec<Product> {
        let catalog = self.catalog.read().await;
        let mut products: Vec<Product> = catalog.by_key.values().cloned().collect();
        products.sort_by_key(|p| p.id);
        products
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn upsert_batch(&self, products: &[NewProduct]) -> anyhow::Result<()> {
        for record in products {
            check_limits(record)?;
        }
        let mut catalog = self.catalog.write().await;
        for record in products {
            catalog.merge(record);
        }
        Ok(())
    }

    async fn find_by_sku(&self, sku: &str) -> anyhow::Result<Option<Product>> {
        Ok(self.catalog.read().await.by_key.get(&sku_key(sku)).cloned())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(i64::try_from(self.catalog.read().await.by_key.len())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ImportJobStatus;

    fn product(sku: &str, name: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            description: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_job_create_and_update() {
        let repo = InMemoryImportJobRepository::new();
        let job = ImportJob::new("a.csv");
        repo.create(&job).await.unwrap();
        assert!(repo.create(&job).await.is_err());

        let updated = repo
            .update(job.id, &ImportJobPatch::new().status(ImportJobStatus::Running))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ImportJobStatus::Running);
        assert_eq!(repo.find_by_id(job.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_job_update_missing_returns_none() {
        let repo = InMemoryImportJobRepository::new();
        let result = repo
            .update(Uuid::new_v4(), &ImportJobPatch::new().processed_rows(1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_job_update_rejects_invalid_patch() {
        let repo = InMemoryImportJobRepository::new();
        let job = ImportJob::new("a.csv");
        repo.create(&job).await.unwrap();
        repo.update(job.id, &ImportJobPatch::new().total_rows(5))
            .await
            .unwrap();
        assert!(repo
            .update(job.id, &ImportJobPatch::new().total_rows(6))
            .await
            .is_err());
        let stored = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.total_rows, Some(5));
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity_and_original_casing() {
        let repo = InMemoryProductRepository::new();
        repo.upsert_batch(&[product("Widget", "first")]).await.unwrap();
        let before = repo.find_by_sku("widget").await.unwrap().unwrap();

        repo.upsert_batch(&[product("WIDGET", "second")]).await.unwrap();
        let after = repo.find_by_sku("wIdGeT").await.unwrap().unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(after.id, before.id);
        assert_eq!(after.sku, "Widget");
        assert_eq!(after.name, "second");
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_catalog_untouched() {
        let repo = InMemoryProductRepository::new();
        repo.upsert_batch(&[product("A", "a")]).await.unwrap();

        let long_name = "n".repeat(MAX_NAME_LEN + 1);
        let err = repo
            .upsert_batch(&[product("A", "changed"), product("B", "b"), product("C", &long_name)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("name exceeds"));

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.find_by_sku("a").await.unwrap().unwrap().name, "a");
        assert!(repo.find_by_sku("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_first_record_rejects_whole_batch() {
        let repo = InMemoryProductRepository::new();
        repo.upsert_batch(&[product("A", "a")]).await.unwrap();

        let long_sku = "s".repeat(MAX_SKU_LEN + 1);
        assert!(repo
            .upsert_batch(&[product(&long_sku, "x"), product("A", "changed"), product("B", "b")])
            .await
            .is_err());

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.find_by_sku("A").await.unwrap().unwrap().name, "a");
        // 失敗したバッチは id を消費しない
        repo.upsert_batch(&[product("B", "b")]).await.unwrap();
        assert_eq!(repo.find_by_sku("B").await.unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_many_batches_merge_in_place() {
        let repo = InMemoryProductRepository::new();
        for round in 0..50 {
            let batch: Vec<NewProduct> = (0..200)
                .map(|i| product(&format!("SKU-{round}-{i}"), "item"))
                .collect();
            repo.upsert_batch(&batch).await.unwrap();
        }
        assert_eq!(repo.count().await.unwrap(), 10_000);

        repo.upsert_batch(&[product("sku-0-0", "renamed"), product("NEW", "new")])
            .await
            .unwrap();
        let first = repo.find_by_sku("SKU-0-0").await.unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.name, "renamed");
        assert_eq!(repo.find_by_sku("new").await.unwrap().unwrap().id, 10_001);
        assert_eq!(repo.count().await.unwrap(), 10_001);
    }

    #[tokio::test]
    async fn test_overlong_sku_rejected() {
        let repo = InMemoryProductRepository::new();
        let sku = "s".repeat(MAX_SKU_LEN + 1);
        assert!(repo.upsert_batch(&[product(&sku, "x")]).await.is_err());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
