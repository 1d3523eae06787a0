use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::domain::entity::{ImportJob, ImportJobPatch};
use crate::domain::repository::ImportJobRepository;
use crate::infrastructure::csv_source::CsvFileSource;
use crate::infrastructure::dispatcher::{ImportDispatcher, ImportRequest};

/// ファイル名の最大長。import_jobs.filename の列長と一致させる。
pub const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum SubmitImportError {
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("failed to store upload: {0}")]
    Upload(String),

    #[error("failed to create import job: {0}")]
    Persist(String),

    #[error("failed to dispatch import job: {0}")]
    Dispatch(String),
}

/// SubmitImportUseCase はアップロードを一時ファイルへ退避し、QUEUED のジョブを作成して
/// バックグラウンド処理へ引き渡す。呼び出し側はジョブの完了を待たない。
pub struct SubmitImportUseCase {
    job_repo: Arc<dyn ImportJobRepository>,
    dispatcher: Arc<dyn ImportDispatcher>,
    upload_dir: PathBuf,
}

impl SubmitImportUseCase {
    pub fn new(
        job_repo: Arc<dyn ImportJobRepository>,
        dispatcher: Arc<dyn ImportDispatcher>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_repo,
            dispatcher,
            upload_dir: upload_dir.into(),
        }
    }

    pub async fn execute<R>(&self, filename: &str, reader: R) -> Result<ImportJob, SubmitImportError>
    where
        R: Read + Send + 'static,
    {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(SubmitImportError::InvalidFilename(
                "filename must not be empty".to_string(),
            ));
        }
        if filename.chars().count() > MAX_FILENAME_LEN {
            return Err(SubmitImportError::InvalidFilename(format!(
                "filename exceeds {MAX_FILENAME_LEN} characters"
            )));
        }

        let source = self.store_upload(reader).await?;
        let job = ImportJob::new(filename);
        self.job_repo
            .create(&job)
            .await
            .map_err(|e| SubmitImportError::Persist(e.to_string()))?;

        info!(
            job_id = %job.id,
            filename = %job.filename,
            location = %source.path().display(),
            "import job queued"
        );

        let request = ImportRequest {
            job_id: job.id,
            source: Arc::new(source),
        };
        if let Err(e) = self.dispatcher.dispatch(request).await {
            let message = format!("failed to dispatch import job: {e}");
            error!(job_id = %job.id, error = %e, "import job dispatch failed");
            if let Err(update_err) = self
                .job_repo
                .update(job.id, &ImportJobPatch::new().failed(message))
                .await
            {
                error!(job_id = %job.id, error = %update_err, "failed to mark undispatched job as failed");
            }
            return Err(SubmitImportError::Dispatch(e.to_string()));
        }

        Ok(job)
    }

    /// アップロード内容を upload_dir 配下の一意な一時ファイルへ書き出す。
    async fn store_upload<R>(&self, mut reader: R) -> Result<CsvFileSource, SubmitImportError>
    where
        R: Read + Send + 'static,
    {
        let dir = self.upload_dir.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<CsvFileSource> {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix("import-")
                .suffix(".csv")
                .tempfile_in(&dir)?;
            std::io::copy(&mut reader, &mut file)?;
            file.flush()?;
            Ok(CsvFileSource::temporary(file.into_temp_path()))
        })
        .await
        .map_err(|e| SubmitImportError::Upload(e.to_string()))?
        .map_err(|e| SubmitImportError::Upload(format!("{e:#}")))
    }
}
