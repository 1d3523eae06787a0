pub mod import_job_postgres;
pub mod in_memory;
pub mod product_postgres;

pub use import_job_postgres::ImportJobPostgresRepository;
pub use in_memory::{InMemoryImportJobRepository, InMemoryProductRepository};
pub use product_postgres::ProductPostgresRepository;
