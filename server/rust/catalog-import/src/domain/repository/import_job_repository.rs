use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::{ImportJob, ImportJobPatch};

/// ImportJobRepository は取込ジョブの永続化を担うリポジトリトレイト。
/// 書き込みは永続化された時点で以降の読み出しから参照可能でなければならない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    /// IDでジョブを検索する。
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>>;

    /// ジョブを作成する。
    async fn create(&self, job: &ImportJob) -> anyhow::Result<()>;

    /// ジョブにパッチを適用し、更新後のジョブを返す。ジョブが存在しない場合は None。
    /// `updated_at` は常に更新される。
    async fn update(&self, id: Uuid, patch: &ImportJobPatch) -> anyhow::Result<Option<ImportJob>>;
}
