use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::ImportJob;
use crate::domain::repository::ImportJobRepository;

#[derive(Debug, thiserror::Error)]
pub enum GetImportJobError {
    #[error("import job not found: {0}")]
    NotFound(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

pub struct GetImportJobUseCase {
    repo: Arc<dyn ImportJobRepository>,
}

impl GetImportJobUseCase {
    pub fn new(repo: Arc<dyn ImportJobRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, job_id: Uuid) -> Result<ImportJob, GetImportJobError> {
        self.repo
            .find_by_id(job_id)
            .await
            .map_err(|e| GetImportJobError::Internal(e.to_string()))?
            .ok_or(GetImportJobError::NotFound(job_id))
    }
}
