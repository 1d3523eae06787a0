pub mod get_import_job;
pub mod run_import;
pub mod submit_import;
pub mod upsert_product_batch;

pub use get_import_job::{GetImportJobError, GetImportJobUseCase};
pub use run_import::{ImportError, ImportOutcome, ImportSummary, RunImportUseCase, SkipReason};
pub use submit_import::{SubmitImportError, SubmitImportUseCase};
pub use upsert_product_batch::{UpsertBatchError, UpsertProductBatchUseCase};
