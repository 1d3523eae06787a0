use std::path::PathBuf;

use serde::Deserialize;

use crate::infrastructure::database::DatabaseConfig;

pub use crate::usecase::run_import::MAX_BATCH_SIZE;

/// Config はアプリケーション全体の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// YAML ファイルから設定を読み込み、検証する。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path, e))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        cfg.import.validate()?;
        Ok(cfg)
    }
}

/// AppConfig はアプリケーション設定。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// ImportConfig は取込パイプラインの設定。
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            upload_dir: default_upload_dir(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_batch_size() -> usize {
    crate::usecase::run_import::DEFAULT_BATCH_SIZE
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("/tmp/product_uploads")
}

fn default_queue_capacity() -> usize {
    64
}

impl ImportConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("import.batch_size must be greater than 0");
        }
        if self.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!(
                "import.batch_size must be at most {}, got {}",
                MAX_BATCH_SIZE,
                self.batch_size
            );
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("import.queue_capacity must be greater than 0");
        }
        Ok(())
    }
}

/// LoggingConfig はログ出力設定。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
