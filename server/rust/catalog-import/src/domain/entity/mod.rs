pub mod import_job;
pub mod product;

pub use import_job::{ImportJob, ImportJobPatch, ImportJobStatus, JobUpdateError};
pub use product::{NewProduct, Product};
