use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::domain::entity::{ImportJobPatch, ImportJobStatus, NewProduct};
use crate::domain::repository::ImportJobRepository;
use crate::domain::service::{normalize_row, ImportSource, NormalizeOutcome};
use crate::infrastructure::csv_reader::{count_rows, RowReader};
use crate::usecase::upsert_product_batch::{UpsertBatchError, UpsertProductBatchUseCase};

/// 1 バッチあたりのレコード数の既定値。
pub const DEFAULT_BATCH_SIZE: usize = 5000;
/// バッチサイズの上限。4 列の複数行 INSERT がバインド変数の上限 (65535) を超えない値。
pub const MAX_BATCH_SIZE: usize = 10_000;

/// ImportError はジョブを FAILED にする致命的なエラー。
/// Display 出力がそのままジョブの error_message になる。
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read input: {0}")]
    InputRead(String),

    #[error(transparent)]
    BatchWrite(#[from] UpsertBatchError),

    #[error("failed to update import job: {0}")]
    JobStore(String),

    #[error("import task aborted: {0}")]
    Join(String),
}

/// ImportSummary は正常終了したジョブの集計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_rows: i64,
    pub processed_rows: i64,
    pub rejected_rows: i64,
}

/// SkipReason はジョブを処理せずに終えた理由。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    JobNotFound,
    NotQueued(ImportJobStatus),
}

/// ImportOutcome は 1 回のパイプライン実行の結果。エラーはここで値に変換され、呼び出し側へは伝播しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Completed(ImportSummary),
    Failed { error: String },
    Skipped(SkipReason),
}

#[derive(Debug, Default)]
struct ScanSummary {
    rows: i64,
    rejected: i64,
}

/// 2 パス目の読み出し。正規化済みレコードをバッチにまとめて送出する。
/// 受信側が閉じられた場合はその時点で読み出しを止める。
fn scan_batches(
    source: &dyn ImportSource,
    batch_size: usize,
    tx: &mpsc::Sender<Vec<NewProduct>>,
) -> anyhow::Result<ScanSummary> {
    let rows = RowReader::new(source.open()?)?;
    let mut summary = ScanSummary::default();
    let mut batch = Vec::with_capacity(batch_size);

    for row in rows {
        let row = row?;
        summary.rows += 1;
        match normalize_row(&row) {
            NormalizeOutcome::Accepted(product) => batch.push(product),
            NormalizeOutcome::Rejected(reason) => {
                summary.rejected += 1;
                trace!(row = summary.rows, reason = %reason, "row rejected");
            }
        }

        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if tx.blocking_send(full).is_err() {
                return Ok(summary);
            }
        }
    }

    if !batch.is_empty() {
        // 受信側が閉じていれば送出できなくてよい
        let _ = tx.blocking_send(batch);
    }
    Ok(summary)
}

/// RunImportUseCase は取込パイプライン本体。
///
/// QUEUED のジョブを RUNNING にし、入力を 2 回走査する。1 回目で行数を数えて
/// `total_rows` を確定し、2 回目で行を正規化してバッチ単位でカタログへマージする。
/// バッチがコミットされるたびに `processed_rows` を更新し、最後に COMPLETED にする。
/// 途中のあらゆる致命的エラーはジョブを FAILED にして終える。
pub struct RunImportUseCase {
    job_repo: Arc<dyn ImportJobRepository>,
    upsert_uc: Arc<UpsertProductBatchUseCase>,
    batch_size: usize,
}

impl RunImportUseCase {
    pub fn new(
        job_repo: Arc<dyn ImportJobRepository>,
        upsert_uc: Arc<UpsertProductBatchUseCase>,
    ) -> Self {
        Self {
            job_repo,
            upsert_uc,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// ジョブを実行する。入力は戻る前に必ず解放される。
    /// QUEUED 以外のジョブは再配送されても何もせず、カウンタも再計算しない。
    pub async fn execute(&self, job_id: Uuid, source: Arc<dyn ImportSource>) -> ImportOutcome {
        let job = match self.job_repo.find_by_id(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                info!(job_id = %job_id, "import job not found, nothing to do");
                return ImportOutcome::Skipped(SkipReason::JobNotFound);
            }
            Err(e) => {
                return self
                    .fail(job_id, ImportError::JobStore(format!("{e:#}")))
                    .await;
            }
        };

        if job.status != ImportJobStatus::Queued {
            warn!(
                job_id = %job_id,
                status = %job.status,
                "import job is not queued, skipping"
            );
            return ImportOutcome::Skipped(SkipReason::NotQueued(job.status));
        }

        info!(
            job_id = %job_id,
            filename = %job.filename,
            location = %source.location(),
            batch_size = self.batch_size,
            "import started"
        );

        match self.run(job_id, source).await {
            Ok(summary) => {
                info!(
                    job_id = %job_id,
                    total_rows = summary.total_rows,
                    processed_rows = summary.processed_rows,
                    rejected_rows = summary.rejected_rows,
                    "import completed"
                );
                ImportOutcome::Completed(summary)
            }
            Err(e) => self.fail(job_id, e).await,
        }
    }

    async fn run(
        &self,
        job_id: Uuid,
        source: Arc<dyn ImportSource>,
    ) -> Result<ImportSummary, ImportError> {
        self.update_job(job_id, ImportJobPatch::new().status(ImportJobStatus::Running))
            .await?;

        let total_rows = self.count_rows(source.clone()).await?;
        self.update_job(job_id, ImportJobPatch::new().total_rows(total_rows))
            .await?;
        debug!(job_id = %job_id, total_rows = total_rows, "row count recorded");

        let (processed_rows, rejected_rows) = self.import_rows(job_id, source).await?;

        self.update_job(
            job_id,
            ImportJobPatch::new().status(ImportJobStatus::Completed),
        )
        .await?;

        Ok(ImportSummary {
            total_rows,
            processed_rows,
            rejected_rows,
        })
    }

    /// 1 パス目: 入力全体を走査して行数を数える。
    async fn count_rows(&self, source: Arc<dyn ImportSource>) -> Result<i64, ImportError> {
        let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            count_rows(source.open()?)
        })
            .await
            .map_err(|e| ImportError::Join(e.to_string()))?
            .map_err(|e| ImportError::InputRead(format!("{e:#}")))?;
        i64::try_from(rows).map_err(|_| ImportError::InputRead(format!("row count {rows} out of range")))
    }

    /// 2 パス目: 行を正規化し、バッチ単位でマージする。(processed, rejected) を返す。
    async fn import_rows(
        &self,
        job_id: Uuid,
        source: Arc<dyn ImportSource>,
    ) -> Result<(i64, i64), ImportError> {
        let (tx, mut rx) = mpsc::channel(1);
        let batch_size = self.batch_size;
        let reader =
            tokio::task::spawn_blocking(move || scan_batches(source.as_ref(), batch_size, &tx));

        let mut processed: i64 = 0;
        let mut failure = None;
        while let Some(batch) = rx.recv().await {
            let submitted = i64::try_from(batch.len()).unwrap_or(i64::MAX);
            if let Err(e) = self.upsert_uc.execute(batch).await {
                failure = Some(ImportError::from(e));
                break;
            }
            processed += submitted;
            if let Err(e) = self
                .update_job(job_id, ImportJobPatch::new().processed_rows(processed))
                .await
            {
                failure = Some(e);
                break;
            }
            debug!(job_id = %job_id, processed_rows = processed, "batch committed");
        }

        // 受信側を閉じて読み出しスレッドを止め、入力の解放を待つ
        drop(rx);
        let scanned = reader
            .await
            .map_err(|e| ImportError::Join(e.to_string()))?;
        if let Some(e) = failure {
            return Err(e);
        }
        let scanned = scanned.map_err(|e| ImportError::InputRead(format!("{e:#}")))?;
        debug!(
            job_id = %job_id,
            rows = scanned.rows,
            rejected = scanned.rejected,
            "input scan finished"
        );
        Ok((processed, scanned.rejected))
    }

    async fn update_job(&self, job_id: Uuid, patch: ImportJobPatch) -> Result<(), ImportError> {
        match self.job_repo.update(job_id, &patch).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(ImportError::JobStore(format!("import job {job_id} no longer exists"))),
            Err(e) => Err(ImportError::JobStore(format!("{e:#}"))),
        }
    }

    async fn fail(&self, job_id: Uuid, err: ImportError) -> ImportOutcome {
        let message = err.to_string();
        error!(job_id = %job_id, error = %message, "import failed");

        match self
            .job_repo
            .update(job_id, &ImportJobPatch::new().failed(message.clone()))
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => warn!(job_id = %job_id, "import job vanished before failure was recorded"),
            Err(e) => error!(job_id = %job_id, error = %e, "failed to record import failure"),
        }
        ImportOutcome::Failed { error: message }
    }
}
