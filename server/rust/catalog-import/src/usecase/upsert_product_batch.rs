use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::entity::NewProduct;
use crate::domain::repository::ProductRepository;

#[derive(Debug, thiserror::Error)]
pub enum UpsertBatchError {
    #[error("batch write failed: {0}")]
    Storage(String),
}

/// 大文字小文字を無視した SKU で重複を除去する。
/// 同一キーは最後に現れたレコードが残り、位置はそのキーが最初に現れた位置を保つ。
pub fn dedup_by_sku(batch: Vec<NewProduct>) -> Vec<NewProduct> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(batch.len());
    let mut cleaned: Vec<NewProduct> = Vec::with_capacity(batch.len());
    for product in batch {
        match positions.get(&product.sku_key()) {
            Some(&idx) => cleaned[idx] = product,
            None => {
                positions.insert(product.sku_key(), cleaned.len());
                cleaned.push(product);
            }
        }
    }
    cleaned
}

/// UpsertProductBatchUseCase は正規化済みバッチをカタログへ原子的かつ冪等にマージする。
/// リトライは行わず、ストレージ障害はそのまま呼び出し側へ返す。
pub struct UpsertProductBatchUseCase {
    repo: Arc<dyn ProductRepository>,
}

impl UpsertProductBatchUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    /// バッチをマージし、重複除去後に書き込んだ件数を返す。
    pub async fn execute(&self, batch: Vec<NewProduct>) -> Result<usize, UpsertBatchError> {
        let submitted = batch.len();
        let cleaned = dedup_by_sku(batch);
        if cleaned.is_empty() {
            return Ok(0);
        }

        self.repo
            .upsert_batch(&cleaned)
            .await
            .map_err(|e| UpsertBatchError::Storage(format!("{e:#}")))?;

        debug!(
            submitted = submitted,
            written = cleaned.len(),
            "product batch merged"
        );
        Ok(cleaned.len())
    }
}
