pub mod domain;
pub mod infrastructure;
pub mod usecase;

/// マイグレーション。データベース接続時とテストで共有する。
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
