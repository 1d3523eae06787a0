use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

/// 設定ファイルを持たず DATABASE_URL だけで接続する場合のプール上限。
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;

/// DatabaseConfig はカタログ DB への接続設定。
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
}

fn default_db_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_open_conns() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl DatabaseConfig {
    /// 接続オプションを組み立てる。未知の ssl_mode はエラー。
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode)
            .with_context(|| format!("invalid database ssl_mode: {}", self.ssl_mode))?;
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode))
    }
}

/// DATABASE_URL を接続オプションとして解釈する。
pub fn options_from_url(url: &str) -> anyhow::Result<PgConnectOptions> {
    PgConnectOptions::from_str(url).context("invalid DATABASE_URL")
}

/// 接続プールを作成する。
pub async fn connect(options: PgConnectOptions, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ssl_mode: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".to_string(),
            port: 6432,
            name: "catalog".to_string(),
            user: "app".to_string(),
            password: "secret".to_string(),
            ssl_mode: ssl_mode.to_string(),
            max_open_conns: 10,
        }
    }

    #[test]
    fn test_connect_options_from_config() {
        let options = config("require").connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6432);
        assert_eq!(options.get_database(), Some("catalog"));
        assert_eq!(options.get_username(), "app");
    }

    #[test]
    fn test_unknown_ssl_mode_is_rejected() {
        let err = config("sometimes").connect_options().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn test_options_from_url() {
        let options = options_from_url("postgres://app:pw@localhost:5433/catalog").unwrap();
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("catalog"));
        assert!(options_from_url("not a url").is_err());
    }

    #[test]
    fn test_database_config_defaults() {
        let yaml = r#"
host: "localhost"
name: "catalog"
user: "app"
"#;
        let config: DatabaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 5432);
        assert_eq!(config.password, "");
        assert_eq!(config.ssl_mode, "disable");
        assert_eq!(config.max_open_conns, DEFAULT_MAX_CONNECTIONS);
        assert!(config.connect_options().is_ok());
    }
}
