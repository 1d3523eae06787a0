pub mod import_source;
pub mod row_normalizer;

pub use import_source::ImportSource;
pub use row_normalizer::{normalize_row, NormalizeOutcome, RawRow, RejectReason};
