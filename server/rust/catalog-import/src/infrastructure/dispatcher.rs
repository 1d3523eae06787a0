use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::domain::service::ImportSource;
use crate::usecase::run_import::{ImportOutcome, RunImportUseCase};

/// ImportRequest はパイプラインへ渡す取込依頼。
pub struct ImportRequest {
    pub job_id: Uuid,
    pub source: Arc<dyn ImportSource>,
}

impl std::fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRequest")
            .field("job_id", &self.job_id)
            .field("source", &self.source.location())
            .finish()
    }
}

/// ImportDispatcher は投入済みジョブをバックグラウンド処理へ引き渡すトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportDispatcher: Send + Sync {
    async fn dispatch(&self, request: ImportRequest) -> anyhow::Result<()>;
}

/// ChannelDispatcher は有界チャネルで ImportWorker へ依頼を送る。
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<ImportRequest>,
}

/// ディスパッチャとワーカー側の受信口を組で生成する。
pub fn channel(capacity: usize) -> (ChannelDispatcher, mpsc::Receiver<ImportRequest>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelDispatcher { tx }, rx)
}

#[async_trait]
impl ImportDispatcher for ChannelDispatcher {
    async fn dispatch(&self, request: ImportRequest) -> anyhow::Result<()> {
        let job_id = request.job_id;
        self.tx
            .send(request)
            .await
            .map_err(|_| anyhow::anyhow!("import queue is closed, job {} not dispatched", job_id))?;
        tracing::debug!(job_id = %job_id, "import job dispatched");
        Ok(())
    }
}

/// ImportWorker はキューから依頼を受け取り、ジョブごとに独立したタスクでパイプラインを実行する。
/// 同時実行数は制限しない。
pub struct ImportWorker {
    rx: mpsc::Receiver<ImportRequest>,
    run_uc: Arc<RunImportUseCase>,
}

impl ImportWorker {
    pub fn new(rx: mpsc::Receiver<ImportRequest>, run_uc: Arc<RunImportUseCase>) -> Self {
        Self { rx, run_uc }
    }

    /// 受信ループを起動する。全送信側が破棄されるとキューを閉じ、
    /// 実行中のジョブがすべて終わるのを待ってから処理件数を返す。
    pub fn start(self) -> tokio::task::JoinHandle<usize> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> usize {
        let mut tasks: JoinSet<(Uuid, ImportOutcome)> = JoinSet::new();
        let mut handled = 0;

        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(ImportRequest { job_id, source }) => {
                        let run_uc = self.run_uc.clone();
                        tasks.spawn(async move { (job_id, run_uc.execute(job_id, source).await) });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    handled += 1;
                    Self::report(joined);
                }
            }
        }

        tracing::info!(in_flight = tasks.len(), "import queue closed, draining");
        while let Some(joined) = tasks.join_next().await {
            handled += 1;
            Self::report(joined);
        }
        handled
    }

    fn report(joined: Result<(Uuid, ImportOutcome), tokio::task::JoinError>) {
        match joined {
            Ok((job_id, ImportOutcome::Completed(summary))) => tracing::debug!(
                job_id = %job_id,
                processed_rows = summary.processed_rows,
                "import task finished"
            ),
            Ok((job_id, ImportOutcome::Failed { error })) => {
                tracing::debug!(job_id = %job_id, error = %error, "import task finished with failure");
            }
            Ok((job_id, ImportOutcome::Skipped(reason))) => {
                tracing::debug!(job_id = %job_id, reason = ?reason, "import task skipped");
            }
            Err(e) => tracing::error!(error = %e, "import task panicked"),
        }
    }
}
