pub mod import_job_repository;
pub mod product_repository;

pub use import_job_repository::ImportJobRepository;
pub use product_repository::ProductRepository;
