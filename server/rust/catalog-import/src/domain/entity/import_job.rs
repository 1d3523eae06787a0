use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ImportJobStatus は取込ジョブの状態を表す。
/// QUEUED → RUNNING → {COMPLETED, FAILED} の順にのみ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl ImportJobStatus {
    pub fn from_str_value(s: &str) -> anyhow::Result<Self> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => anyhow::bail!("invalid import job status: {}", s),
        }
    }

    /// 終端状態かどうかを返す。
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// `next` への遷移が許されるかを返す。同一状態への更新は許可する。
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// JobUpdateError はジョブへのパッチ適用が不変条件に違反した場合のエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobUpdateError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ImportJobStatus,
        to: ImportJobStatus,
    },

    #[error("total_rows is already set to {0}")]
    TotalRowsAlreadySet(i64),

    #[error("processed_rows cannot decrease: {current} -> {requested}")]
    ProcessedRowsDecreased { current: i64, requested: i64 },

    #[error("error_message may only be set together with FAILED status")]
    ErrorMessageWithoutFailure,
}

/// ImportJob は投入された 1 ファイル分の取込ジョブ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub filename: String,
    pub status: ImportJobStatus,
    pub total_rows: Option<i64>,
    pub processed_rows: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// QUEUED 状態の新しいジョブを作成する。
    pub fn new(filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            status: ImportJobStatus::Queued,
            total_rows: None,
            processed_rows: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// パッチを検証してから適用する。検証に失敗した場合ジョブは変更されない。
    pub fn apply(&mut self, patch: &ImportJobPatch) -> Result<(), JobUpdateError> {
        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return Err(JobUpdateError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
        }
        if patch.total_rows.is_some() {
            if let Some(current) = self.total_rows {
                return Err(JobUpdateError::TotalRowsAlreadySet(current));
            }
        }
        if let Some(requested) = patch.processed_rows {
            if requested < self.processed_rows {
                return Err(JobUpdateError::ProcessedRowsDecreased {
                    current: self.processed_rows,
                    requested,
                });
            }
        }
        if patch.error_message.is_some() && patch.status != Some(ImportJobStatus::Failed) {
            return Err(JobUpdateError::ErrorMessageWithoutFailure);
        }

        if let Some(next) = patch.status {
            self.status = next;
        }
        if let Some(total) = patch.total_rows {
            self.total_rows = Some(total);
        }
        if let Some(processed) = patch.processed_rows {
            self.processed_rows = processed;
        }
        if let Some(ref message) = patch.error_message {
            self.error_message = Some(message.clone());
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// ImportJobPatch はジョブの部分更新内容。値が設定されたフィールドのみ適用される。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportJobPatch {
    pub status: Option<ImportJobStatus>,
    pub total_rows: Option<i64>,
    pub processed_rows: Option<i64>,
    pub error_message: Option<String>,
}

impl ImportJobPatch {
    /// 更新可能なフィールド名の一覧。
    pub const UPDATABLE_FIELDS: [&'static str; 4] =
        ["status", "total_rows", "processed_rows", "error_message"];

    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(mut self, status: ImportJobStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn total_rows(mut self, total_rows: i64) -> Self {
        self.total_rows = Some(total_rows);
        self
    }

    #[must_use]
    pub fn processed_rows(mut self, processed_rows: i64) -> Self {
        self.processed_rows = Some(processed_rows);
        self
    }

    /// FAILED への遷移とエラーメッセージをまとめて設定する。
    #[must_use]
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.status = Some(ImportJobStatus::Failed);
        self.error_message = Some(error_message.into());
        self
    }

    /// 値が設定されているフィールド名を返す（ログ出力用）。
    pub fn field_names(&self) -> Vec<&'static str> {
        let present = [
            self.status.is_some(),
            self.total_rows.is_some(),
            self.processed_rows.is_some(),
            self.error_message.is_some(),
        ];
        Self::UPDATABLE_FIELDS
            .iter()
            .zip(present)
            .filter_map(|(name, set)| set.then_some(*name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}
