use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{ImportJob, ImportJobPatch, ImportJobStatus};
use crate::domain::repository::ImportJobRepository;

pub struct ImportJobPostgresRepository {
    pool: PgPool,
}

impl ImportJobPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportJobRepository for ImportJobPostgresRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>> {
        let row = sqlx::query_as::<_, ImportJobRow>(
            r#"SELECT id, filename, status, total_rows, processed_rows, error_message,
                      created_at, updated_at
               FROM catalog.import_jobs WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ImportJob::try_from).transpose()
    }

    async fn create(&self, job: &ImportJob) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO catalog.import_jobs
               (id, filename, status, total_rows, processed_rows, error_message,
                created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(job.id)
        .bind(&job.filename)
        .bind(job.status.to_string())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, id: Uuid, patch: &ImportJobPatch) -> anyhow::Result<Option<ImportJob>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ImportJobRow>(
            r#"SELECT id, filename, status, total_rows, processed_rows, error_message,
                      created_at, updated_at
               FROM catalog.import_jobs WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut job = ImportJob::try_from(row)?;
        job.apply(patch)?;

        let row = sqlx::query_as::<_, ImportJobRow>(
            r#"UPDATE catalog.import_jobs SET
               status = $2,
               total_rows = $3,
               processed_rows = $4,
               error_message = $5,
               updated_at = NOW()
               WHERE id = $1
               RETURNING id, filename, status, total_rows, processed_rows, error_message,
                         created_at, updated_at"#,
        )
        .bind(id)
        .bind(job.status.to_string())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(&job.error_message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::trace!(job_id = %id, fields = ?patch.field_names(), "import job updated");
        ImportJob::try_from(row).map(Some)
    }
}

#[derive(sqlx::FromRow)]
struct ImportJobRow {
    id: Uuid,
    filename: String,
    status: String,
    total_rows: Option<i64>,
    processed_rows: i64,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ImportJobRow> for ImportJob {
    type Error = anyhow::Error;

    fn try_from(row: ImportJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            filename: row.filename,
            status: ImportJobStatus::from_str_value(&row.status)?,
            total_rows: row.total_rows,
            processed_rows: row.processed_rows,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
