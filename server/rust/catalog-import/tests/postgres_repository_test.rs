#![cfg(feature = "db-tests")]
//! PostgreSQL リポジトリのテスト。`--features db-tests` と DATABASE_URL が必要。

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use catalog_import_server::domain::entity::{ImportJob, ImportJobPatch, ImportJobStatus, NewProduct};
use catalog_import_server::domain::repository::{ImportJobRepository, ProductRepository};
use catalog_import_server::infrastructure::persistence::{
    ImportJobPostgresRepository, ProductPostgresRepository,
};
use catalog_import_server::usecase::UpsertProductBatchUseCase;

// --- マイグレーター定義 ---
// sqlx::test マクロ用。マイグレーションを自動適用する。
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn product(sku: &str, name: &str) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: name.to_string(),
        description: None,
        active: true,
    }
}

// --- ジョブストア ---

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_create_and_find_job(pool: PgPool) {
    let repo = ImportJobPostgresRepository::new(pool);
    let job = ImportJob::new("products.csv");
    repo.create(&job).await.unwrap();

    let found = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(found.id, job.id);
    assert_eq!(found.filename, "products.csv");
    assert_eq!(found.status, ImportJobStatus::Queued);
    assert!(found.total_rows.is_none());
    assert_eq!(found.processed_rows, 0);
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_find_missing_job_returns_none(pool: PgPool) {
    let repo = ImportJobPostgresRepository::new(pool);
    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_update_job_lifecycle(pool: PgPool) {
    let repo = ImportJobPostgresRepository::new(pool);
    let job = ImportJob::new("products.csv");
    repo.create(&job).await.unwrap();

    let running = repo
        .update(job.id, &ImportJobPatch::new().status(ImportJobStatus::Running))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(running.status, ImportJobStatus::Running);
    assert!(running.updated_at >= job.updated_at);

    repo.update(job.id, &ImportJobPatch::new().total_rows(12_000))
        .await
        .unwrap();
    repo.update(job.id, &ImportJobPatch::new().processed_rows(5000))
        .await
        .unwrap();
    let failed = repo
        .update(job.id, &ImportJobPatch::new().failed("disk full"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(failed.status, ImportJobStatus::Failed);
    assert_eq!(failed.total_rows, Some(12_000));
    assert_eq!(failed.processed_rows, 5000);
    assert_eq!(failed.error_message.as_deref(), Some("disk full"));
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_update_rejects_backward_transition(pool: PgPool) {
    let repo = ImportJobPostgresRepository::new(pool);
    let job = ImportJob::new("products.csv");
    repo.create(&job).await.unwrap();
    repo.update(job.id, &ImportJobPatch::new().status(ImportJobStatus::Running))
        .await
        .unwrap();

    assert!(repo
        .update(job.id, &ImportJobPatch::new().status(ImportJobStatus::Queued))
        .await
        .is_err());
    let stored = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ImportJobStatus::Running);
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_update_missing_job_returns_none(pool: PgPool) {
    let repo = ImportJobPostgresRepository::new(pool);
    let result = repo
        .update(Uuid::new_v4(), &ImportJobPatch::new().processed_rows(1))
        .await
        .unwrap();
    assert!(result.is_none());
}

// --- 商品カタログ ---

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_upsert_inserts_and_merges_case_insensitively(pool: PgPool) {
    let repo = ProductPostgresRepository::new(pool);
    repo.upsert_batch(&[product("Widget", "original")])
        .await
        .unwrap();
    let before = repo.find_by_sku("widget").await.unwrap().unwrap();

    repo.upsert_batch(&[NewProduct {
        description: Some("shiny".to_string()),
        ..product("WIDGET", "renamed")
    }])
    .await
    .unwrap();
    let after = repo.find_by_sku("WiDgEt").await.unwrap().unwrap();

    assert_eq!(repo.count().await.unwrap(), 1);
    assert_eq!(after.id, before.id);
    assert_eq!(after.sku, "Widget");
    assert_eq!(after.name, "renamed");
    assert_eq!(after.description.as_deref(), Some("shiny"));
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_upsert_is_idempotent(pool: PgPool) {
    let repo = ProductPostgresRepository::new(pool);
    let batch = vec![product("A", "a"), product("B", "b")];
    repo.upsert_batch(&batch).await.unwrap();
    repo.upsert_batch(&batch).await.unwrap();

    assert_eq!(repo.count().await.unwrap(), 2);
    assert_eq!(repo.find_by_sku("a").await.unwrap().unwrap().name, "a");
    assert_eq!(repo.find_by_sku("b").await.unwrap().unwrap().name, "b");
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_duplicate_keys_are_collapsed_before_write(pool: PgPool) {
    // 1 文の INSERT ... ON CONFLICT は同一キーを 2 回更新できないため、ユースケース側で除去する
    let uc = UpsertProductBatchUseCase::new(Arc::new(ProductPostgresRepository::new(pool.clone())));
    let written = uc
        .execute(vec![product("A", "first"), product("a", "second")])
        .await
        .unwrap();
    assert_eq!(written, 1);

    let repo = ProductPostgresRepository::new(pool);
    assert_eq!(repo.count().await.unwrap(), 1);
    assert_eq!(repo.find_by_sku("A").await.unwrap().unwrap().name, "second");
}

#[sqlx::test(migrator = "MIGRATOR")]
async fn test_failed_batch_leaves_no_partial_rows(pool: PgPool) {
    let repo = ProductPostgresRepository::new(pool);
    repo.upsert_batch(&[product("A", "a")]).await.unwrap();

    // name 列の長さ制限を超える行で書き込みを失敗させる
    let long_name = "n".repeat(256);
    let result = repo
        .upsert_batch(&[product("A", "changed"), product("B", "b"), product("C", &long_name)])
        .await;
    assert!(result.is_err());

    assert_eq!(repo.count().await.unwrap(), 1);
    assert_eq!(repo.find_by_sku("a").await.unwrap().unwrap().name, "a");
    assert!(repo.find_by_sku("b").await.unwrap().is_none());
}
